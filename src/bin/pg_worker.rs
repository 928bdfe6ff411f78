//! Runs embedded `PostgreSQL` lifecycle steps for the integration tests when
//! the test runner is root.
//!
//! ```text
//! pg_worker <setup|start|stop> <payload.json>
//! ```
//!
//! The payload is a serialized `pg_embedded_setup_unpriv::worker::WorkerPayload`
//! holding cluster settings and the environment to apply. The process
//! re-executes itself as `nobody` before touching the data directory, since
//! `initdb` and `postgres` refuse to run as root.

/// Boxed error returned from `main`.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(unix)]
fn main() -> Result<(), BoxError> {
    unix::run()
}

#[cfg(not(unix))]
fn main() -> Result<(), BoxError> {
    Err("pg_worker only runs on Unix".into())
}

#[cfg(unix)]
mod unix {
    use super::BoxError;
    use camino::{Utf8Path, Utf8PathBuf};
    use nix::unistd::{Uid, User, initgroups, setgid, setuid};
    use pg_embedded_setup_unpriv::ambient_dir_and_path;
    use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
    use postgresql_embedded::{PostgreSQL, Status};
    use std::env;
    use std::ffi::CString;
    use std::io::{self, Read};
    use std::process::{Command, ExitStatus};
    use thiserror::Error;

    const REEXEC_MARKER: &str = "TIMEBILL_PG_WORKER_DEMOTED";
    const SAFE_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";
    const UNPRIVILEGED_USER: &str = "nobody";

    #[derive(Debug, Error)]
    enum WorkerFailure {
        #[error("usage: pg_worker <setup|start|stop> <payload.json>: {0}")]
        Usage(String),
        #[error("cannot read payload: {0}")]
        Payload(#[source] BoxError),
        #[error("cannot decode payload: {0}")]
        Decode(#[source] serde_json::Error),
        #[error("invalid cluster settings: {0}")]
        Settings(String),
        #[error("cannot build runtime: {0}")]
        Runtime(#[source] io::Error),
        #[error("cannot drop privileges: {0}")]
        Demote(String),
        #[error("postgres {step} failed: {reason}")]
        Postgres { step: &'static str, reason: String },
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Setup,
        Start,
        Stop,
    }

    impl Step {
        const fn name(self) -> &'static str {
            match self {
                Self::Setup => "setup",
                Self::Start => "start",
                Self::Stop => "stop",
            }
        }
    }

    impl TryFrom<&str> for Step {
        type Error = WorkerFailure;

        fn try_from(raw: &str) -> Result<Self, Self::Error> {
            match raw {
                "setup" => Ok(Self::Setup),
                "start" => Ok(Self::Start),
                "stop" => Ok(Self::Stop),
                other => Err(WorkerFailure::Usage(format!("unknown step '{other}'"))),
            }
        }
    }

    pub(super) fn run() -> Result<(), BoxError> {
        let args = utf8_args()?;
        if Uid::effective().is_root() && env::var_os(REEXEC_MARKER).is_none() {
            let status = reexec_unprivileged(&args)?;
            std::process::exit(status.code().unwrap_or(1));
        }
        let (step, payload_path) = parse_args(&args)?;
        let payload = read_payload(&payload_path)?;
        demote(UNPRIVILEGED_USER)?;
        let settings = payload
            .settings
            .into_settings()
            .map_err(|err| WorkerFailure::Settings(err.to_string()))?;
        apply_environment(&payload.environment);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WorkerFailure::Runtime)?;
        let mut postgres = PostgreSQL::new(settings);
        runtime.block_on(perform(step, &mut postgres))?;
        if matches!(step, Step::Start) {
            // The server must outlive this process.
            std::mem::forget(postgres);
        }
        Ok(())
    }

    fn utf8_args() -> Result<Vec<Utf8PathBuf>, WorkerFailure> {
        env::args_os()
            .map(|arg| {
                arg.into_string()
                    .map(Utf8PathBuf::from)
                    .map_err(|_| WorkerFailure::Usage("arguments must be UTF-8".to_owned()))
            })
            .collect()
    }

    fn parse_args(args: &[Utf8PathBuf]) -> Result<(Step, Utf8PathBuf), WorkerFailure> {
        match args {
            [_, step, payload] => Ok((Step::try_from(step.as_str())?, payload.clone())),
            _ => Err(WorkerFailure::Usage(format!(
                "expected two arguments, got {}",
                args.len().saturating_sub(1)
            ))),
        }
    }

    fn read_payload(path: &Utf8Path) -> Result<WorkerPayload, WorkerFailure> {
        let bytes = read_file(path).map_err(WorkerFailure::Payload)?;
        serde_json::from_slice(&bytes).map_err(WorkerFailure::Decode)
    }

    fn read_file(path: &Utf8Path) -> Result<Vec<u8>, BoxError> {
        let (dir, relative) = ambient_dir_and_path(path)?;
        let mut file = dir.open(relative.as_std_path())?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    async fn perform(step: Step, postgres: &mut PostgreSQL) -> Result<(), WorkerFailure> {
        let failed = |err: postgresql_embedded::Error| WorkerFailure::Postgres {
            step: step.name(),
            reason: err.to_string(),
        };
        match step {
            Step::Setup => {
                postgres.setup().await.map_err(failed)?;
                start_if_stopped(postgres).await.map_err(failed)
            }
            Step::Start => start_if_stopped(postgres).await.map_err(failed),
            Step::Stop => postgres.stop().await.map_err(failed),
        }
    }

    async fn start_if_stopped(
        postgres: &mut PostgreSQL,
    ) -> Result<(), postgresql_embedded::Error> {
        if matches!(postgres.status(), Status::Started) {
            return Ok(());
        }
        postgres.start().await
    }

    fn reexec_unprivileged(args: &[Utf8PathBuf]) -> Result<ExitStatus, WorkerFailure> {
        let exe = env::current_exe().map_err(WorkerFailure::Runtime)?;
        let forwarded = args.iter().skip(1).map(|arg| arg.as_std_path());
        match Command::new("runuser")
            .args(["-u", UNPRIVILEGED_USER, "--"])
            .arg(&exe)
            .args(forwarded)
            .env(REEXEC_MARKER, "1")
            .env("PATH", SAFE_PATH)
            .status()
        {
            Ok(status) => Ok(status),
            Err(err) if err.kind() == io::ErrorKind::NotFound => reexec_via_su(&exe, args),
            Err(err) => Err(WorkerFailure::Demote(err.to_string())),
        }
    }

    fn reexec_via_su(
        exe: &std::path::Path,
        args: &[Utf8PathBuf],
    ) -> Result<ExitStatus, WorkerFailure> {
        let exe_text = exe
            .to_str()
            .ok_or_else(|| WorkerFailure::Demote("executable path is not UTF-8".to_owned()))?;
        let mut script = format!("{REEXEC_MARKER}=1 exec {}", single_quoted(exe_text));
        for arg in args.iter().skip(1) {
            script.push(' ');
            script.push_str(&single_quoted(arg.as_str()));
        }
        Command::new("/bin/su")
            .args(["-s", "/bin/sh", UNPRIVILEGED_USER, "-c"])
            .arg(script)
            .env("PATH", SAFE_PATH)
            .status()
            .map_err(|err| WorkerFailure::Demote(err.to_string()))
    }

    /// Quotes `value` for a POSIX shell, closing and reopening the quotes
    /// around each embedded `'`.
    fn single_quoted(value: &str) -> String {
        format!("'{}'", value.replace('\'', "'\\''"))
    }

    fn demote(username: &str) -> Result<(), WorkerFailure> {
        if !Uid::effective().is_root() {
            return Ok(());
        }
        let demote_err = |err: nix::Error| WorkerFailure::Demote(err.to_string());
        let user = User::from_name(username)
            .map_err(demote_err)?
            .ok_or_else(|| WorkerFailure::Demote(format!("no such user '{username}'")))?;
        let name = CString::new(user.name.clone())
            .map_err(|err| WorkerFailure::Demote(err.to_string()))?;
        initgroups(&name, user.gid).map_err(demote_err)?;
        setgid(user.gid).map_err(demote_err)?;
        setuid(user.uid).map_err(demote_err)?;
        // SAFETY: no other thread exists yet.
        unsafe {
            env::set_var("HOME", &user.dir);
            env::set_var("USER", &user.name);
            env::set_var("LOGNAME", &user.name);
        }
        Ok(())
    }

    fn apply_environment(environment: &[(String, Option<PlainSecret>)]) {
        for (key, value) in environment {
            // SAFETY: no other thread exists yet.
            unsafe {
                match value {
                    Some(secret) => env::set_var(key, secret.expose()),
                    None => env::remove_var(key),
                }
            }
        }
    }

}
