//! Bounded-duration serial output monitor
//!
//! Streams whatever the device sends to the console for a fixed window:
//! - Header once the port is open, footer once the window closes
//! - Lenient decoding, flushed per chunk so partial lines show up live
//! - Optional capture of the decoded stream to a log file
//!
//! The loop polls the port for buffered input and only sleeps when there
//! is none, never past the end of the window. A read never waits longer
//! than the port's read timeout, so a run ends within
//! `duration + poll_interval + timeout` of its start.

use crate::decode::{InvalidBytes, LenientDecoder};
use crate::error::{MonitorError, Result};
use crate::serial::{PortConfig, SerialConnection, SerialSource};
use chrono::Local;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const SEPARATOR_WIDTH: usize = 60;

/// Configuration for a monitoring run
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Port configuration
    pub port_config: PortConfig,
    /// Board name shown in the status line
    pub device_name: String,
    /// Length of the monitoring window
    pub duration: Duration,
    /// Idle time between polls when no input is buffered
    pub poll_interval: Duration,
    pub invalid: InvalidBytes,
    /// Capture file for the decoded stream (optional)
    pub log_file: Option<PathBuf>,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The full monitoring window elapsed
    Completed,
    /// The stop flag was raised before the window closed
    Interrupted,
}

/// Serial output monitor
pub struct SerialMonitor {
    config: MonitorConfig,
    decoder: LenientDecoder,
    log_writer: Option<BufWriter<File>>,
    bytes_read: usize,
}

impl SerialMonitor {
    /// Create a new serial monitor with the given configuration
    pub fn new(config: MonitorConfig) -> Self {
        let decoder = LenientDecoder::new(config.invalid);
        Self {
            config,
            decoder,
            log_writer: None,
            bytes_read: 0,
        }
    }

    /// Create the capture log, if one is configured
    pub fn open_capture(&mut self) -> Result<()> {
        let Some(ref path) = self.config.log_file else {
            return Ok(());
        };

        let log_err = |source| MonitorError::Log {
            path: path.clone(),
            source,
        };

        let file = File::create(path).map_err(log_err)?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "# {} @ {} baud, capture started {}",
            self.config.port_config.port_path,
            self.config.port_config.baud_rate,
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
        )
        .map_err(log_err)?;

        log::debug!("capturing to {}", path.display());
        self.log_writer = Some(writer);
        Ok(())
    }

    /// Total bytes received so far
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Monitor `source` until the window closes or `stop` is raised.
    pub fn run<S, W>(&mut self, source: &mut S, out: &mut W, stop: &AtomicBool) -> Result<Outcome>
    where
        S: SerialSource,
        W: Write,
    {
        self.print_header(out)?;

        let duration = self.config.duration;
        let start = Instant::now();
        let mut buffer = Vec::new();

        let outcome = loop {
            if stop.load(Ordering::SeqCst) {
                break Outcome::Interrupted;
            }

            let elapsed = start.elapsed();
            if elapsed >= duration {
                break Outcome::Completed;
            }

            let available = source.bytes_available()?;
            if available == 0 {
                std::thread::sleep(self.config.poll_interval.min(duration - elapsed));
                continue;
            }

            buffer.resize(available, 0);
            let n = source.read_available(&mut buffer)?;
            if n > 0 {
                self.bytes_read += n;
                log::trace!("read {} bytes ({} pending)", n, self.decoder.pending_len());
                let text = self.decoder.decode(&buffer[..n]);
                self.emit(&text, out)?;
            }
        };

        let tail = self.decoder.finish();
        self.emit(&tail, out)?;

        log::debug!("monitor {:?} after {:?}", outcome, start.elapsed());

        self.print_footer(out, outcome)?;
        if let Some(ref mut writer) = self.log_writer {
            writer.flush()?;
        }
        Ok(outcome)
    }

    /// Write decoded text to the console and capture log, flushing both
    fn emit<W: Write>(&mut self, text: &str, out: &mut W) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        out.write_all(text.as_bytes())?;
        out.flush()?;

        if let Some(ref mut writer) = self.log_writer {
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
        }
        Ok(())
    }

    fn print_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        writeln!(
            out,
            "Connected to {}. Monitoring output for {}...",
            self.config.device_name,
            describe_duration(self.config.duration)
        )?;
        writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        out.flush()
    }

    fn print_footer<W: Write>(&self, out: &mut W, outcome: Outcome) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        match outcome {
            Outcome::Completed => writeln!(out, "Monitoring complete.")?,
            Outcome::Interrupted => writeln!(out, "Monitoring interrupted.")?,
        }
        out.flush()
    }
}

/// "10 seconds", "1 second", "0.5 seconds"
fn describe_duration(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        let secs = duration.as_secs();
        if secs == 1 {
            "1 second".to_string()
        } else {
            format!("{} seconds", secs)
        }
    } else {
        format!("{} seconds", duration.as_secs_f64())
    }
}

/// Open the configured port and monitor it, writing to standard output.
///
/// The connection lives for exactly this call and is closed on every
/// return path, including errors.
pub fn run_monitor(config: MonitorConfig, stop: &AtomicBool) -> Result<Outcome> {
    let mut connection = SerialConnection::open(config.port_config.clone())?;

    let mut monitor = SerialMonitor::new(config);
    monitor.open_capture()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = monitor.run(&mut connection, &mut out, stop)?;

    log::debug!("{} bytes received", monitor.bytes_read());
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Source that releases scripted chunks once their offset has passed
    struct ScriptedSource {
        start: Instant,
        script: VecDeque<(Duration, Vec<u8>)>,
        buffered: Vec<u8>,
        max_read: usize,
    }

    impl ScriptedSource {
        fn silent() -> Self {
            Self {
                start: Instant::now(),
                script: VecDeque::new(),
                buffered: Vec::new(),
                max_read: usize::MAX,
            }
        }

        /// Make `bytes` available `ms` milliseconds after creation
        fn at(mut self, ms: u64, bytes: &[u8]) -> Self {
            self.script.push_back((Duration::from_millis(ms), bytes.to_vec()));
            self
        }
    }

    impl SerialSource for ScriptedSource {
        fn bytes_available(&mut self) -> Result<usize> {
            let elapsed = self.start.elapsed();
            while let Some((at, _)) = self.script.front() {
                if *at > elapsed {
                    break;
                }
                if let Some((_, bytes)) = self.script.pop_front() {
                    self.buffered.extend_from_slice(&bytes);
                }
            }
            Ok(self.buffered.len())
        }

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = buf.len().min(self.buffered.len()).min(self.max_read);
            buf[..n].copy_from_slice(&self.buffered[..n]);
            self.buffered.drain(..n);
            Ok(n)
        }
    }

    struct BrokenSource;

    impl SerialSource for BrokenSource {
        fn bytes_available(&mut self) -> Result<usize> {
            Ok(4)
        }

        fn read_available(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Err(MonitorError::Read {
                path: "/dev/ttyUSB9".into(),
                source: io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"),
            })
        }
    }

    fn test_config(duration_ms: u64) -> MonitorConfig {
        MonitorConfig {
            port_config: PortConfig::new("/dev/ttyUSB9"),
            device_name: "ESP32".to_string(),
            duration: Duration::from_millis(duration_ms),
            poll_interval: Duration::from_millis(20),
            invalid: InvalidBytes::Replace,
            log_file: None,
        }
    }

    fn run_with(config: MonitorConfig, source: &mut impl SerialSource) -> (Outcome, String) {
        let mut monitor = SerialMonitor::new(config);
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);
        let outcome = monitor.run(source, &mut out, &stop).unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_silent_device_prints_only_framing() {
        let (outcome, output) = run_with(test_config(100), &mut ScriptedSource::silent());

        let sep = "-".repeat(60);
        let expected = format!(
            "{sep}\nConnected to ESP32. Monitoring output for 0.1 seconds...\n{sep}\n\n{sep}\nMonitoring complete.\n"
        );
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(output, expected);
    }

    #[test]
    fn test_output_preserves_order_without_duplication() {
        let mut source = ScriptedSource::silent().at(0, b"hello\n").at(200, b"world\n");
        let (outcome, output) = run_with(test_config(400), &mut source);

        assert_eq!(outcome, Outcome::Completed);
        assert!(output.contains("hello\nworld\n"));
        assert_eq!(output.matches("hello").count(), 1);
        assert_eq!(output.matches("world").count(), 1);

        let header_end = output.find("seconds...").unwrap();
        let data_at = output.find("hello").unwrap();
        let footer_at = output.find("Monitoring complete.").unwrap();
        assert!(header_end < data_at && data_at < footer_at);
    }

    #[test]
    fn test_invalid_bytes_do_not_stop_the_run() {
        let mut source = ScriptedSource::silent().at(0, b"\xFFOK\n");
        let (outcome, output) = run_with(test_config(100), &mut source);

        assert_eq!(outcome, Outcome::Completed);
        assert!(output.contains("\u{FFFD}OK\n"));

        let mut config = test_config(100);
        config.invalid = InvalidBytes::Drop;
        let mut source = ScriptedSource::silent().at(0, b"\xFFOK\n");
        let (_, output) = run_with(config, &mut source);
        assert!(output.contains("---\nOK\n"));
        assert!(!output.contains('\u{FFFD}'));
    }

    #[test]
    fn test_character_split_between_reads() {
        let mut source = ScriptedSource::silent().at(0, b"temp 21\xC2").at(60, b"\xB0C\n");
        let (_, output) = run_with(test_config(200), &mut source);
        assert!(output.contains("temp 21\u{B0}C\n"));
    }

    #[test]
    fn test_short_reads_are_drained() {
        let mut source = ScriptedSource::silent().at(0, b"0123456789abcdef\n");
        source.max_read = 3;
        let mut monitor = SerialMonitor::new(test_config(100));
        let mut out = Vec::new();
        monitor.run(&mut source, &mut out, &AtomicBool::new(false)).unwrap();

        assert!(String::from_utf8(out).unwrap().contains("0123456789abcdef\n"));
        assert_eq!(monitor.bytes_read(), 17);
    }

    #[test]
    fn test_loop_terminates_within_bound() {
        let config = test_config(150);
        let bound = config.duration + config.poll_interval + config.port_config.timeout;

        let start = Instant::now();
        run_with(config, &mut ScriptedSource::silent());
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed < bound, "took {:?}", elapsed);
    }

    #[test]
    fn test_stop_flag_interrupts() {
        let mut monitor = SerialMonitor::new(test_config(10_000));
        let mut out = Vec::new();
        let stop = AtomicBool::new(true);

        let start = Instant::now();
        let outcome = monitor
            .run(&mut ScriptedSource::silent(), &mut out, &stop)
            .unwrap();

        assert_eq!(outcome, Outcome::Interrupted);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(String::from_utf8(out).unwrap().ends_with("Monitoring interrupted.\n"));
    }

    #[test]
    fn test_read_error_is_terminal() {
        let mut monitor = SerialMonitor::new(test_config(1_000));
        let mut out = Vec::new();
        let err = monitor
            .run(&mut BrokenSource, &mut out, &AtomicBool::new(false))
            .unwrap_err();

        assert!(matches!(err, MonitorError::Read { .. }));
        let cause = std::error::Error::source(&err).unwrap();
        assert!(cause.to_string().contains("device unplugged"));
        assert!(!String::from_utf8(out).unwrap().contains("Monitoring complete."));
    }

    #[test]
    fn test_capture_log_mirrors_stream() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("capture.log");

        let mut config = test_config(100);
        config.log_file = Some(log_path.clone());

        let mut monitor = SerialMonitor::new(config);
        monitor.open_capture().unwrap();
        let mut source = ScriptedSource::silent().at(0, b"boot: ok\n");
        monitor
            .run(&mut source, &mut Vec::<u8>::new(), &AtomicBool::new(false))
            .unwrap();

        let captured = std::fs::read_to_string(&log_path).unwrap();
        let mut lines = captured.lines();
        assert!(lines.next().unwrap().starts_with("# /dev/ttyUSB9 @ 115200 baud"));
        assert_eq!(lines.next(), Some("boot: ok"));
    }

    #[test]
    fn test_capture_log_unwritable() {
        let mut config = test_config(100);
        config.log_file = Some(PathBuf::from("/nonexistent-dir/capture.log"));

        let err = SerialMonitor::new(config).open_capture().unwrap_err();
        assert!(matches!(err, MonitorError::Log { .. }));
    }

    #[test]
    fn test_describe_duration() {
        assert_eq!(describe_duration(Duration::from_secs(10)), "10 seconds");
        assert_eq!(describe_duration(Duration::from_secs(1)), "1 second");
        assert_eq!(describe_duration(Duration::from_millis(500)), "0.5 seconds");
    }
}
