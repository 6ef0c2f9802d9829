use crate::error::LogError;

/// Prefix that marks a line as a seek request rather than log data.
pub const SEEK_COMMAND_PREFIX: &[u8] = b"AESDCHAR_IOCSEEKTO:";

/// Seek target: the `write_cmd`-th live entry (0 = oldest), byte
/// `write_cmd_offset` inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekTo {
    pub write_cmd:        u32,
    pub write_cmd_offset: u32,
}

impl SeekTo {
    pub fn new(write_cmd: u32, write_cmd_offset: u32) -> Self {
        Self { write_cmd, write_cmd_offset }
    }
}

/// Classifies a complete line.
///
/// `None` means the line is plain data. `Some(Err(_))` means it carries the
/// seek prefix but the `X,Y` part does not parse.
pub fn parse_command(line: &[u8]) -> Option<Result<SeekTo, LogError>> {
    let rest = line.strip_prefix(SEEK_COMMAND_PREFIX)?;
    let rest = rest.strip_suffix(b"\n").unwrap_or(rest);
    let rest = rest.strip_suffix(b"\r").unwrap_or(rest);
    Some(parse_target(rest))
}

fn parse_target(args: &[u8]) -> Result<SeekTo, LogError> {
    let text = std::str::from_utf8(args)
        .map_err(|_| LogError::invalid("seek target is not valid UTF-8"))?;
    let (cmd, offset) = text
        .split_once(',')
        .ok_or_else(|| LogError::invalid(format!("expected X,Y but got {:?}", text)))?;
    let write_cmd = parse_field(cmd, "command index")?;
    let write_cmd_offset = parse_field(offset, "command offset")?;
    Ok(SeekTo { write_cmd, write_cmd_offset })
}

fn parse_field(s: &str, what: &str) -> Result<u32, LogError> {
    // u32::from_str accepts a leading '+', which the wire form does not.
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LogError::invalid(format!("{} {:?} is not a decimal number", what, s)));
    }
    s.parse()
        .map_err(|_| LogError::invalid(format!("{} {:?} is out of range", what, s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_lines_are_not_commands() {
        assert!(parse_command(b"hello world\n").is_none());
        assert!(parse_command(b"AESDCHAR_IOCSEEKT0:1,2\n").is_none());
    }

    #[test]
    fn well_formed_command() {
        let seek = parse_command(b"AESDCHAR_IOCSEEKTO:2,5\n").unwrap().unwrap();
        assert_eq!(seek, SeekTo::new(2, 5));
    }

    #[test]
    fn tolerates_crlf() {
        let seek = parse_command(b"AESDCHAR_IOCSEEKTO:0,0\r\n").unwrap().unwrap();
        assert_eq!(seek, SeekTo::new(0, 0));
    }

    #[test]
    fn malformed_commands_are_rejected() {
        for line in [
            &b"AESDCHAR_IOCSEEKTO:\n"[..],
            b"AESDCHAR_IOCSEEKTO:1\n",
            b"AESDCHAR_IOCSEEKTO:a,b\n",
            b"AESDCHAR_IOCSEEKTO:1,-2\n",
            b"AESDCHAR_IOCSEEKTO:+1,2\n",
            b"AESDCHAR_IOCSEEKTO:1, 2\n",
            b"AESDCHAR_IOCSEEKTO:99999999999,0\n",
        ] {
            match parse_command(line) {
                Some(Err(LogError::InvalidArgument(_))) => {}
                other => panic!("{:?} parsed as {:?}", String::from_utf8_lossy(line), other),
            }
        }
    }
}
