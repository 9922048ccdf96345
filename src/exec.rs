//! Running the cached executable

use std::io;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Starts a built program and reports how it ended
pub trait Launcher {
    /// Run `path` with `arg0` as its zeroth argument and `args` after it.
    ///
    /// Returns the program's exit status. An error of kind
    /// [`io::ErrorKind::NotFound`] means the executable does not exist.
    fn launch(&self, path: &Path, arg0: &str, args: &[String]) -> io::Result<i32>;
}

/// Replaces the current process image with the program
///
/// Only returns when the exec itself fails. The program inherits the
/// environment, the descriptors and the process id, so its exit status
/// becomes the caller's.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecLauncher;

#[cfg(unix)]
impl Launcher for ExecLauncher {
    fn launch(&self, path: &Path, arg0: &str, args: &[String]) -> io::Result<i32> {
        use std::os::unix::process::CommandExt;

        debug!("exec {} as {arg0}", path.display());
        Err(Command::new(path).arg0(arg0).args(args).exec())
    }
}

/// Runs the program as a child and waits for it
#[derive(Debug, Default, Clone, Copy)]
pub struct SpawnLauncher;

impl Launcher for SpawnLauncher {
    fn launch(&self, path: &Path, arg0: &str, args: &[String]) -> io::Result<i32> {
        debug!("spawn {} as {arg0}", path.display());

        let mut command = Command::new(path);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.arg0(arg0);
        }
        let status = command.args(args).status()?;

        Ok(exit_code(status))
    }
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// Status `gr` itself exits with after the program exited with `code`.
/// Statuses that do not fit a byte, possible off Unix, become 255.
pub fn passthrough_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(u8::MAX)
}

/// Process replacement where available, spawning elsewhere
pub fn default_launcher() -> Box<dyn Launcher> {
    #[cfg(unix)]
    {
        Box::new(ExecLauncher)
    }
    #[cfg(not(unix))]
    {
        Box::new(SpawnLauncher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn passthrough_status_clamps() {
        assert_eq!(passthrough_status(0), 0);
        assert_eq!(passthrough_status(3), 3);
        assert_eq!(passthrough_status(255), 255);
        assert_eq!(passthrough_status(256), 255);
        assert_eq!(passthrough_status(-1073741819), 255);
    }

    #[test]
    fn missing_program_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = SpawnLauncher
            .launch(&dir.path().join("absent"), "absent", &[])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn exec_of_missing_program_returns_not_found() {
        let dir = TempDir::new().unwrap();
        let err = ExecLauncher
            .launch(&dir.path().join("absent"), "absent", &[])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn spawned_exit_status_and_arguments() {
        let args = ["-c".to_string(), "[ \"$0\" = prog ] || exit 9; exit 7".to_string()];
        let code = SpawnLauncher.launch(Path::new("/bin/sh"), "prog", &args).unwrap();
        assert_eq!(code, 7);
    }
}
