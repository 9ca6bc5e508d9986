use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, PoisonError};

use nix::errno::Errno;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::error::{Error, Result};

// Write end of the wake-up socket, read by the signal handler.
static WAKE_FD: AtomicI32 = AtomicI32::new(-1);
static WAKE_WRITER: Mutex<Option<UnixStream>> = Mutex::new(None);

/// Handler registration that remembers what it displaced.
#[derive(Debug)]
pub struct TrapToken {
    signal: Signal,
    previous: Option<SigAction>,
}

impl TrapToken {
    pub fn new(signal: Signal, previous: Option<SigAction>) -> Self {
        Self { signal, previous }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn previous(&self) -> Option<&SigAction> {
        self.previous.as_ref()
    }
}

pub trait SignalTrap: Send + Sync {
    fn install(&self, signal: Signal) -> Result<TrapToken>;
    /// Restores the handler that was active before `install`. On failure the
    /// caller still owns the token.
    fn uninstall(&self, token: &TrapToken) -> Result<()>;
}

/// OS-level trap: the handler wakes a dump thread that writes to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct NixSignalTrap;

impl SignalTrap for NixSignalTrap {
    fn install(&self, signal: Signal) -> Result<TrapToken> {
        ensure_dump_worker()?;
        let action = SigAction::new(
            SigHandler::Handler(on_dump_signal),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        // SAFETY: the handler only calls write(2) on a descriptor that lives for the process.
        let previous = unsafe { sigaction(signal, &action) }.map_err(signal_error)?;
        Ok(TrapToken::new(signal, Some(previous)))
    }

    fn uninstall(&self, token: &TrapToken) -> Result<()> {
        if let Some(previous) = token.previous() {
            // SAFETY: restores the exact action returned by sigaction in `install`.
            unsafe { sigaction(token.signal(), previous) }.map_err(signal_error)?;
        }
        Ok(())
    }
}

fn signal_error(errno: Errno) -> Error {
    Error::Signal(errno.into())
}

extern "C" fn on_dump_signal(_signal: libc::c_int) {
    let fd = WAKE_FD.load(Ordering::Relaxed);
    if fd >= 0 {
        wake_dump_worker(fd);
    }
}

// Runs in signal context: one write(2), errno left as the interrupted code saw it.
fn wake_dump_worker(fd: libc::c_int) {
    let saved = Errno::last_raw();
    let byte = 1u8;
    // A full socket buffer means a dump is already pending; the byte is dropped.
    unsafe {
        libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
    }
    Errno::set_raw(saved);
}

fn ensure_dump_worker() -> Result<()> {
    let mut writer = WAKE_WRITER.lock().unwrap_or_else(PoisonError::into_inner);
    if writer.is_some() {
        return Ok(());
    }

    let (wake_tx, mut wake_rx) = UnixStream::pair()?;
    wake_tx.set_nonblocking(true)?;

    std::thread::Builder::new()
        .name("sigdump".to_owned())
        .spawn(move || {
            let mut buffer = [0u8; 64];
            loop {
                match wake_rx.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(_) => {
                        let stderr = std::io::stderr();
                        let mut out = stderr.lock();
                        if let Err(err) = write_dump(&mut out) {
                            tracing::warn!(error = %err, "failed to write sigdump");
                        }
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        tracing::error!(error = %err, "sigdump worker stopped");
                        break;
                    }
                }
            }
        })?;

    WAKE_FD.store(wake_tx.as_raw_fd(), Ordering::SeqCst);
    *writer = Some(wake_tx);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadReport {
    pub tid: String,
    pub name: String,
    pub state: String,
    pub frames: Vec<String>,
}

/// Every live thread of this process, read from procfs.
pub fn collect_threads() -> Vec<ThreadReport> {
    let Ok(entries) = std::fs::read_dir("/proc/self/task") else {
        return vec![current_thread_report()];
    };

    let mut reports: Vec<ThreadReport> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let tid = entry.file_name().to_string_lossy().into_owned();
            let dir = entry.path();
            let name = std::fs::read_to_string(dir.join("comm"))
                .map(|comm| comm.trim().to_owned())
                .unwrap_or_default();
            let state = std::fs::read_to_string(dir.join("stat"))
                .ok()
                .and_then(|stat| parse_stat_state(&stat))
                .unwrap_or_else(|| "?".to_owned());
            let frames = match std::fs::read_to_string(dir.join("stack")) {
                Ok(stack) if !stack.trim().is_empty() => {
                    stack.lines().map(str::to_owned).collect()
                }
                _ => std::fs::read_to_string(dir.join("wchan"))
                    .map(|wchan| vec![format!("wchan: {}", wchan.trim())])
                    .unwrap_or_default(),
            };
            ThreadReport {
                tid,
                name,
                state,
                frames,
            }
        })
        .collect();
    reports.sort_by_key(|report| report.tid.parse::<u64>().unwrap_or(u64::MAX));
    reports
}

fn current_thread_report() -> ThreadReport {
    let backtrace = std::backtrace::Backtrace::force_capture().to_string();
    ThreadReport {
        tid: format!("{:?}", std::thread::current().id()),
        name: std::thread::current()
            .name()
            .unwrap_or("<unnamed>")
            .to_owned(),
        state: "R".to_owned(),
        frames: backtrace.lines().map(str::to_owned).collect(),
    }
}

// `stat` is "tid (comm) S ..."; comm may itself contain ')'.
fn parse_stat_state(stat: &str) -> Option<String> {
    let (_, rest) = stat.rsplit_once(')')?;
    rest.split_whitespace().next().map(str::to_owned)
}

pub fn write_dump(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Simple sigdump on {}", std::process::id())?;
    for thread in collect_threads() {
        writeln!(
            out,
            "Thread: {} ({}) state={}",
            thread.tid, thread.name, thread.state
        )?;
        for frame in &thread.frames {
            writeln!(out, "  {frame}")?;
        }
        writeln!(out)?;
    }
    out.flush()
}

/// Accepts `QUIT`, `SIGQUIT` (any case) or a signal number.
pub fn parse_signal(name: &str) -> Result<Signal> {
    let trimmed = name.trim();
    if let Ok(number) = trimmed.parse::<i32>() {
        return Signal::try_from(number).map_err(|_| Error::InvalidSignal(trimmed.to_owned()));
    }

    let upper = trimmed.to_ascii_uppercase();
    let full = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    Signal::from_str(&full).map_err(|_| Error::InvalidSignal(trimmed.to_owned()))
}

/// Reads a `sigdump_sig` setting: blank disables the handler.
pub fn parse_signal_setting(name: &str) -> Result<Option<Signal>> {
    if name.trim().is_empty() {
        return Ok(None);
    }
    parse_signal(name).map(Some)
}

/// `none | installed(signal)` state of the diagnostic dump handler.
pub struct Sigdump {
    trap: Box<dyn SignalTrap>,
    installed: Mutex<Option<TrapToken>>,
}

impl Sigdump {
    pub fn new(trap: Box<dyn SignalTrap>) -> Self {
        Self {
            trap,
            installed: Mutex::new(None),
        }
    }

    pub fn system() -> Self {
        Self::new(Box::new(NixSignalTrap))
    }

    pub fn installed_signal(&self) -> Option<Signal> {
        self.installed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(TrapToken::signal)
    }

    /// Moves to `installed(next)` or `none`. An empty name means disabled.
    ///
    /// The target is parsed before anything is uninstalled, so an unknown
    /// signal name leaves the current handler in place. A handler that
    /// cannot be removed stays recorded as installed.
    pub fn transition(&self, next: Option<&str>) -> Result<()> {
        let target = next.map(parse_signal_setting).transpose()?.flatten();

        let mut installed = self.installed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = installed.as_ref() {
            let signal = token.signal();
            self.trap.uninstall(token)?;
            tracing::info!(signal = signal.as_str(), "sigdump handler removed");
            *installed = None;
        }
        if let Some(signal) = target {
            *installed = Some(self.trap.install(signal)?);
            tracing::info!(signal = signal.as_str(), "sigdump handler installed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Sigdump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sigdump")
            .field("installed", &self.installed_signal())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use nix::errno::Errno;
    use nix::sys::signal::{SigHandler, Signal};

    use super::{
        parse_signal, parse_signal_setting, parse_stat_state, wake_dump_worker, write_dump,
        NixSignalTrap, SignalTrap, Sigdump, TrapToken,
    };
    use crate::error::{Error, Result};

    #[derive(Clone, Default)]
    pub(crate) struct RecordingTrap {
        pub(crate) events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingTrap {
        pub(crate) fn events(&self) -> Vec<String> {
            self.events.lock().expect("events lock").clone()
        }
    }

    impl SignalTrap for RecordingTrap {
        fn install(&self, signal: Signal) -> Result<TrapToken> {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("install {}", signal.as_str()));
            Ok(TrapToken::new(signal, None))
        }

        fn uninstall(&self, token: &TrapToken) -> Result<()> {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("uninstall {}", token.signal().as_str()));
            Ok(())
        }
    }

    #[test]
    fn parses_signal_spellings() {
        assert_eq!(parse_signal("QUIT").ok(), Some(Signal::SIGQUIT));
        assert_eq!(parse_signal("sigusr1").ok(), Some(Signal::SIGUSR1));
        assert_eq!(parse_signal(" 10 ").ok(), Some(Signal::SIGUSR1));
        let error = parse_signal("NOPE").expect_err("unknown signal");
        assert!(matches!(error, Error::InvalidSignal(ref name) if name == "NOPE"));
    }

    #[test]
    fn blank_setting_disables() {
        assert_eq!(parse_signal_setting("  ").ok(), Some(None));
        assert_eq!(parse_signal_setting("USR1").ok(), Some(Some(Signal::SIGUSR1)));
        parse_signal_setting("BOGUS").expect_err("unknown signal");
    }

    #[test]
    fn transitions_between_states() {
        let trap = RecordingTrap::default();
        let sigdump = Sigdump::new(Box::new(trap.clone()));

        sigdump.transition(Some("QUIT")).expect("install");
        assert_eq!(sigdump.installed_signal(), Some(Signal::SIGQUIT));
        sigdump.transition(Some("USR2")).expect("replace");
        assert_eq!(sigdump.installed_signal(), Some(Signal::SIGUSR2));
        sigdump.transition(None).expect("remove");
        assert_eq!(sigdump.installed_signal(), None);

        assert_eq!(
            trap.events(),
            vec![
                "install SIGQUIT",
                "uninstall SIGQUIT",
                "install SIGUSR2",
                "uninstall SIGUSR2"
            ]
        );
    }

    #[test]
    fn unknown_signal_keeps_current_handler() {
        let trap = RecordingTrap::default();
        let sigdump = Sigdump::new(Box::new(trap.clone()));
        sigdump.transition(Some("QUIT")).expect("install");

        sigdump
            .transition(Some("BOGUS"))
            .expect_err("unknown signal should fail");
        assert_eq!(sigdump.installed_signal(), Some(Signal::SIGQUIT));
        assert_eq!(trap.events(), vec!["install SIGQUIT"]);

        sigdump.transition(Some("")).expect("empty disables");
        assert_eq!(sigdump.installed_signal(), None);
    }

    // Installs normally but cannot restore the previous handler.
    #[derive(Clone, Default)]
    struct StuckTrap {
        inner: RecordingTrap,
    }

    impl SignalTrap for StuckTrap {
        fn install(&self, signal: Signal) -> Result<TrapToken> {
            self.inner.install(signal)
        }

        fn uninstall(&self, _token: &TrapToken) -> Result<()> {
            Err(Error::Signal(Errno::EINVAL.into()))
        }
    }

    #[test]
    fn waking_the_worker_preserves_errno() {
        Errno::set_raw(Errno::ENOENT as i32);
        // Not an open descriptor, so the write itself fails with EBADF.
        wake_dump_worker(libc::c_int::MAX);
        assert_eq!(Errno::last(), Errno::ENOENT);
    }

    #[test]
    fn failed_uninstall_keeps_handler_recorded() {
        let trap = StuckTrap::default();
        let sigdump = Sigdump::new(Box::new(trap.clone()));
        sigdump.transition(Some("QUIT")).expect("install");

        let error = sigdump
            .transition(Some("USR2"))
            .expect_err("uninstall failure should surface");
        assert!(
            matches!(error, Error::Signal(ref err) if err.raw_os_error() == Some(Errno::EINVAL as i32))
        );
        assert_eq!(sigdump.installed_signal(), Some(Signal::SIGQUIT));

        sigdump
            .transition(None)
            .expect_err("still cannot uninstall");
        assert_eq!(sigdump.installed_signal(), Some(Signal::SIGQUIT));
        assert_eq!(trap.inner.events(), vec!["install SIGQUIT"]);
    }

    #[test]
    fn os_trap_restores_displaced_handler() {
        let trap = NixSignalTrap;
        let token = trap.install(Signal::SIGUSR2).expect("install");
        assert!(matches!(
            token.previous().map(|action| action.handler()),
            Some(SigHandler::SigDfl)
        ));
        trap.uninstall(&token).expect("uninstall");

        let again = trap.install(Signal::SIGUSR2).expect("reinstall");
        assert!(matches!(
            again.previous().map(|action| action.handler()),
            Some(SigHandler::SigDfl)
        ));
        trap.uninstall(&again).expect("uninstall");
    }

    #[test]
    fn stat_state_survives_parenthesised_names() {
        assert_eq!(
            parse_stat_state("42 (worker (1)) S 1 2 3").as_deref(),
            Some("S")
        );
        assert_eq!(parse_stat_state("garbage"), None);
    }

    #[test]
    fn dump_lists_pid_and_threads() {
        let mut out = Vec::new();
        write_dump(&mut out).expect("dump should write");
        let text = String::from_utf8(out).expect("utf8 dump");
        assert!(text.starts_with(&format!("Simple sigdump on {}", std::process::id())));
        assert!(text.contains("Thread: "));
    }
}
