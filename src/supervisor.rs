//! Process-per-agent supervision.
//!
//! Each agent runs in its own child process. A child signals readiness by
//! printing `LISTENING <addr>` on stdout once its socket is bound; the next
//! child is only started after that. On ctrl-c or SIGTERM every child gets
//! SIGTERM and is waited for.

use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::agent::AgentKind;

/// Prefix of the readiness line written by an agent process.
pub const READY_PREFIX: &str = "LISTENING ";

const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);
const TERMINATE_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to start {kind} agent: {source}")]
    Spawn {
        kind: AgentKind,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} agent exited before becoming ready ({status})")]
    ExitedBeforeReady { kind: AgentKind, status: ExitStatus },

    #[error("{kind} agent did not become ready within {timeout:?}")]
    ReadyTimeout { kind: AgentKind, timeout: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the readiness line to stdout.
pub fn announce_ready(addr: SocketAddr) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}{}", READY_PREFIX, addr)?;
    out.flush()
}

/// Parse a readiness line, if `line` is one.
pub fn parse_ready_line(line: &str) -> Option<SocketAddr> {
    line.trim().strip_prefix(READY_PREFIX)?.trim().parse().ok()
}

/// Resolves on ctrl-c, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// One agent to launch.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    pub kind: AgentKind,
    pub port: u16,
}

impl AgentSpec {
    /// Arguments selecting this agent on the command line.
    pub fn args(&self) -> Vec<String> {
        vec![
            "agent".to_string(),
            self.kind.as_str().to_string(),
            "--port".to_string(),
            self.port.to_string(),
        ]
    }
}

struct ManagedChild {
    kind: AgentKind,
    child: Child,
}

/// Launches and tears down agent processes.
pub struct Supervisor {
    program: PathBuf,
    base_args: Vec<String>,
    ready_timeout: Duration,
    terminate_grace: Duration,
    children: Vec<ManagedChild>,
}

impl Supervisor {
    /// Supervise children running `program <base_args..> agent <kind> --port <port>`.
    pub fn new(program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            terminate_grace: TERMINATE_GRACE,
            children: Vec::new(),
        }
    }

    /// Supervise copies of the running executable.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, Vec::new()))
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// How long a child may take to exit after SIGTERM before it is killed.
    pub fn with_terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace = grace;
        self
    }

    /// Process ids of the running agents, in start order.
    pub fn pids(&self) -> Vec<u32> {
        self.children.iter().filter_map(|c| c.child.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Launch every agent in order, each after the previous one is ready.
    /// On failure the agents already running are terminated.
    pub async fn start_all(&mut self, specs: &[AgentSpec]) -> Result<Vec<SocketAddr>, SupervisorError> {
        let mut addrs = Vec::with_capacity(specs.len());
        for spec in specs {
            match self.start(*spec).await {
                Ok(addr) => addrs.push(addr),
                Err(e) => {
                    self.shutdown().await;
                    return Err(e);
                }
            }
        }
        Ok(addrs)
    }

    /// Launch one agent and wait for its readiness line.
    pub async fn start(&mut self, spec: AgentSpec) -> Result<SocketAddr, SupervisorError> {
        let kind = spec.kind;
        let mut child = Command::new(&self.program)
            .args(&self.base_args)
            .args(spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn { kind, source })?;

        let stdout = child.stdout.take().ok_or_else(|| SupervisorError::Spawn {
            kind,
            source: std::io::Error::new(std::io::ErrorKind::Other, "stdout not captured"),
        })?;
        let mut lines = BufReader::new(stdout).lines();

        let waited = tokio::time::timeout(self.ready_timeout, async {
            while let Some(line) = lines.next_line().await? {
                if let Some(addr) = parse_ready_line(&line) {
                    return Ok::<_, std::io::Error>(Some(addr));
                }
                println!("[{}] {}", kind, line);
            }
            Ok(None)
        })
        .await;

        let addr = match waited {
            Ok(Ok(Some(addr))) => addr,
            Ok(Ok(None)) => {
                let status = child.wait().await?;
                return Err(SupervisorError::ExitedBeforeReady { kind, status });
            }
            Ok(Err(e)) => {
                terminate(&mut child, self.terminate_grace).await;
                return Err(e.into());
            }
            Err(_) => {
                terminate(&mut child, self.terminate_grace).await;
                return Err(SupervisorError::ReadyTimeout {
                    kind,
                    timeout: self.ready_timeout,
                });
            }
        };

        tracing::info!("{} agent ready on {} (pid {:?})", kind, addr, child.id());

        // Keep draining stdout so the child never blocks on a full pipe.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                println!("[{}] {}", kind, line);
            }
        });

        self.children.push(ManagedChild { kind, child });
        Ok(addr)
    }

    /// Wait until every child has exited on its own.
    pub async fn wait_all(&mut self) {
        let waits = self.children.iter_mut().map(|managed| async move {
            match managed.child.wait().await {
                Ok(status) => tracing::warn!("{} agent exited: {}", managed.kind, status),
                Err(e) => tracing::error!("Failed to wait for {} agent: {}", managed.kind, e),
            }
        });
        futures::future::join_all(waits).await;
    }

    /// Send SIGTERM to every child, then wait for all of them together.
    pub async fn shutdown(&mut self) {
        for managed in self.children.iter_mut() {
            send_terminate(&mut managed.child);
        }

        let grace = self.terminate_grace;
        let reaps = self.children.iter_mut().map(|managed| async move {
            reap(&mut managed.child, grace).await;
            tracing::info!("{} agent stopped", managed.kind);
        });
        futures::future::join_all(reaps).await;

        self.children.clear();
    }

    /// Block until ctrl-c/SIGTERM (then stop all children) or until every
    /// child has exited by itself.
    pub async fn run_until_shutdown(&mut self) {
        self.run_until(shutdown_signal()).await
    }

    /// Like [`run_until_shutdown`](Self::run_until_shutdown), stopping the
    /// children when `shutdown` resolves.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let all_exited = tokio::select! {
            _ = shutdown => false,
            _ = self.wait_all() => true,
        };

        if all_exited {
            tracing::info!("All agents exited");
            self.children.clear();
        } else {
            tracing::info!("Shutting down agents...");
            self.shutdown().await;
            tracing::info!("All agents stopped.");
        }
    }
}

/// Ask a child to stop with SIGTERM, escalating to SIGKILL after `grace`.
async fn terminate(child: &mut Child, grace: Duration) {
    send_terminate(child);
    reap(child, grace).await;
}

fn send_terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        // Already reaped.
        return;
    };

    #[cfg(unix)]
    {
        // SAFETY: plain kill(2) on a pid we spawned and have not yet reaped.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            tracing::debug!("SIGTERM to pid {} failed: {}", pid, std::io::Error::last_os_error());
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        let _ = child.start_kill();
    }
}

/// Wait up to `grace` for the child to exit, then kill it.
async fn reap(child: &mut Child, grace: Duration) {
    let pid = child.id();
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::warn!("Failed to wait for pid {:?}: {}", pid, e),
        Err(_) => {
            tracing::warn!("pid {:?} ignored SIGTERM, killing", pid);
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill pid {:?}: {}", pid, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> Supervisor {
        Supervisor::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    fn spec(kind: AgentKind) -> AgentSpec {
        AgentSpec {
            kind,
            port: kind.default_port(),
        }
    }

    #[test]
    fn ready_line_round_trip() {
        assert_eq!(
            parse_ready_line("LISTENING 127.0.0.1:9000\n"),
            Some("127.0.0.1:9000".parse().unwrap())
        );
        assert_eq!(
            parse_ready_line("LISTENING [::]:9001"),
            Some("[::]:9001".parse().unwrap())
        );
        assert_eq!(parse_ready_line("LISTENING soon"), None);
        assert_eq!(parse_ready_line("booting"), None);
    }

    #[test]
    fn agent_args() {
        assert_eq!(
            spec(AgentKind::Factor).args(),
            vec!["agent", "factor", "--port", "9001"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn waits_for_readiness_then_terminates() {
        let mut sup = shell("echo booting; echo LISTENING 127.0.0.1:4242; exec sleep 30");

        let addr = sup.start(spec(AgentKind::Calculator)).await.unwrap();
        assert_eq!(addr, "127.0.0.1:4242".parse().unwrap());
        assert_eq!(sup.len(), 1);

        let started = std::time::Instant::now();
        sup.shutdown().await;
        assert!(sup.is_empty());
        assert!(started.elapsed() < TERMINATE_GRACE);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn early_exit_is_reported() {
        let mut sup = shell("exit 3");
        let err = sup.start(spec(AgentKind::Factor)).await.unwrap_err();
        match err {
            SupervisorError::ExitedBeforeReady { kind, status } => {
                assert_eq!(kind, AgentKind::Factor);
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(sup.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_child_times_out() {
        let mut sup = shell("exec sleep 30").with_ready_timeout(Duration::from_millis(200));
        let err = sup.start(spec(AgentKind::Factor)).await.unwrap_err();
        assert!(matches!(err, SupervisorError::ReadyTimeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_start_stops_earlier_agents() {
        let mut sup = Supervisor::new(
            "sh",
            vec![
                "-c".to_string(),
                // $1 is "agent", $2 the kind.
                r#"if [ "$2" = calculator ]; then echo LISTENING 127.0.0.1:9000; exec sleep 30; else exit 1; fi"#
                    .to_string(),
                "sh".to_string(),
            ],
        );

        let err = sup
            .start_all(&[spec(AgentKind::Calculator), spec(AgentKind::Factor)])
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::ExitedBeforeReady { kind: AgentKind::Factor, .. }));
        assert!(sup.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn wait_all_returns_when_children_exit() {
        let mut sup = shell("echo LISTENING 127.0.0.1:1; exit 0");
        sup.start(spec(AgentKind::Calculator)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), sup.wait_all())
            .await
            .unwrap();
    }

    #[cfg(unix)]
    fn is_alive(pid: u32) -> bool {
        // Signal 0 only checks that the process exists.
        unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shutdown_future_stops_every_agent() {
        let mut sup = shell("echo LISTENING 127.0.0.1:9000; exec sleep 30");
        sup.start_all(&[spec(AgentKind::Calculator), spec(AgentKind::Factor)])
            .await
            .unwrap();

        let pids = sup.pids();
        assert_eq!(pids.len(), 2);
        assert!(pids.iter().all(|&pid| is_alive(pid)));

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(());
        });

        let started = std::time::Instant::now();
        tokio::time::timeout(
            Duration::from_secs(5),
            sup.run_until(async {
                let _ = rx.await;
            }),
        )
        .await
        .unwrap();

        assert!(started.elapsed() < TERMINATE_GRACE);
        assert!(sup.is_empty());
        assert!(pids.iter().all(|&pid| !is_alive(pid)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stubborn_agents_share_one_grace_period() {
        let mut sup = shell("trap '' TERM; echo LISTENING 127.0.0.1:9000; exec sleep 30")
            .with_terminate_grace(Duration::from_millis(500));
        sup.start_all(&[spec(AgentKind::Calculator), spec(AgentKind::Factor)])
            .await
            .unwrap();
        let pids = sup.pids();

        let started = std::time::Instant::now();
        sup.shutdown().await;

        // Sequential grace periods would take at least a full second.
        assert!(started.elapsed() < Duration::from_millis(950));
        assert!(pids.iter().all(|&pid| !is_alive(pid)));
    }
}
