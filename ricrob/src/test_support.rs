//! Test-only helpers: a sample task and scripted fake solvers.

use crate::core::task::{Coord, Robots, Task, Tiles};

/// A valid task with robots in the four corners.
pub fn sample_task() -> Task {
    Task {
        tiles: Tiles {
            top_left: "A1".to_string(),
            top_right: "B2".to_string(),
            bottom_left: "C3".to_string(),
            bottom_right: "D4".to_string(),
        },
        robots: Robots {
            yellow: Coord::new(0, 0),
            red: Coord::new(15, 0),
            green: Coord::new(0, 15),
            blue: Coord::new(15, 15),
        },
        target: "yellow-pyramid".to_string(),
    }
}

#[cfg(unix)]
pub use self::fake::FakeSolvers;

#[cfg(unix)]
mod fake {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use anyhow::{Context, Result};
    use tempfile::TempDir;

    use crate::core::outcome::SolverId;
    use crate::io::config::DispatchConfig;

    /// Informational lines a chatty solver prints before its verdict.
    const NOISE: &str = r#"for i in 1 2 3 4 5 6 7 8 9 10; do
  printf '{"msg":"progress","depth":%s}\n' "$i"
done"#;

    /// Directory of executable `/bin/sh` scripts standing in for solvers.
    pub struct FakeSolvers {
        dir: TempDir,
    }

    impl FakeSolvers {
        pub fn new() -> Result<Self> {
            let dir = tempfile::tempdir().context("create fake solver dir")?;
            Ok(Self { dir })
        }

        pub fn path(&self) -> &Path {
            self.dir.path()
        }

        /// Write an executable script with `body` and return its solver id.
        pub fn script(&self, name: &str, body: &str) -> Result<SolverId> {
            let path = self.dir.path().join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n"))
                .with_context(|| format!("write {}", path.display()))?;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .with_context(|| format!("chmod {}", path.display()))?;
            Ok(SolverId::new(path.display().to_string()))
        }

        /// Prints ten progress lines, sleeps `delay_secs`, then emits a result
        /// record with `moves` (a JSON array literal) and exits 0.
        pub fn sentinel(&self, name: &str, delay_secs: f64, moves: &str) -> Result<SolverId> {
            let body = format!(
                "{NOISE}\n{}printf '%s\\n' '{{\"msg\":\"result\",\"moves\":{moves}}}'\nexit 0",
                sleep_line(delay_secs)
            );
            self.script(name, &body)
        }

        /// Prints the same ten progress lines but never a result record.
        pub fn without_result(&self, name: &str) -> Result<SolverId> {
            self.script(name, &format!("{NOISE}\nexit 0"))
        }

        /// Complains on stderr and exits with `code` after `delay_secs`.
        pub fn failing(&self, name: &str, delay_secs: f64, code: i32) -> Result<SolverId> {
            let body = format!(
                "{}echo 'no solution' >&2\nexit {code}",
                sleep_line(delay_secs)
            );
            self.script(name, &body)
        }

        /// Never finishes on its own.
        pub fn hanging(&self, name: &str) -> Result<SolverId> {
            self.script(name, "exec sleep 30")
        }

        /// Prints a result and exits at once, leaving a background process
        /// that holds stdout open for `linger_secs`.
        pub fn detaching(&self, name: &str, linger_secs: u32) -> Result<SolverId> {
            let body = format!(
                "sleep {linger_secs} &\nprintf '%s\\n' '{{\"msg\":\"result\",\"moves\":[]}}'\nexit 0"
            );
            self.script(name, &body)
        }

        /// Reports its own argument list as the single move.
        pub fn echo_args(&self, name: &str) -> Result<SolverId> {
            self.script(
                name,
                r#"printf '{"msg":"result","moves":["%s"]}\n' "$*""#,
            )
        }

        /// Config running `solvers` with a short poll interval.
        pub fn config(&self, solvers: &[SolverId]) -> DispatchConfig {
            DispatchConfig {
                solvers: solvers.to_vec(),
                poll_interval_ms: 10,
                ..DispatchConfig::default()
            }
        }
    }

    fn sleep_line(delay_secs: f64) -> String {
        if delay_secs > 0.0 {
            format!("sleep {delay_secs}\n")
        } else {
            String::new()
        }
    }
}
