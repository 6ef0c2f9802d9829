use crate::error::LogError;
use crate::shared_log::SharedLog;
use crate::util::CancelToken;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use log::{debug, warn};
use std::fmt::{Display, Write as _};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// RFC 2822 style, e.g. `timestamp:Tue, 14 Oct 2026 09:30:00 +0000`.
pub const DEFAULT_FORMAT: &str = "timestamp:%a, %d %b %Y %H:%M:%S %z";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Renders one newline-terminated timestamp record.
pub fn format_record<Tz: TimeZone>(now: &DateTime<Tz>, format: &str) -> Result<Vec<u8>, LogError>
where
    Tz::Offset: Display,
{
    let mut line = String::new();
    write!(line, "{}", now.format(format))
        .map_err(|_| LogError::invalid(format!("timestamp format {:?} cannot be rendered", format)))?;
    line.push('\n');
    Ok(line.into_bytes())
}

/// False when chrono cannot render `format`.
pub fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Appends a timestamp record every `interval` until `cancel` fires. The
/// cancellation flag is rechecked every `tick`. An unrenderable `format`
/// is refused up front with `InvalidInput`.
pub fn spawn(
    log: Arc<SharedLog>,
    interval: Duration,
    format: String,
    cancel: CancelToken,
    tick: Duration,
) -> io::Result<JoinHandle<()>> {
    if !is_valid_format(&format) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("timestamp format {:?} is not a valid strftime pattern", format),
        ));
    }
    thread::Builder::new().name("timestamp".into()).spawn(move || {
        let mut next = Instant::now() + interval;
        while !cancel.is_cancelled() {
            let now = Instant::now();
            if now < next {
                thread::sleep(tick.min(next - now));
                continue;
            }
            match format_record(&chrono::Local::now(), &format).and_then(|r| log.append_line(r)) {
                Ok(())  => debug!("timestamp appended"),
                Err(e)  => warn!("timestamp append failed: {}", e),
            }
            next += interval;
        }
    })
}
