//! Integration tests for gr

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use serial_test::serial;

    fn gr() -> Command {
        let mut cmd = cargo_bin_cmd!("gr");
        cmd.env_remove("GR_CONFIG");
        cmd
    }

    #[test]
    #[serial]
    fn help_displays() {
        gr().arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cached `go run`"));
    }

    #[test]
    #[serial]
    fn go_style_help_displays() {
        gr().arg("-h").assert().success().stdout(predicate::str::contains("PACKAGE"));
    }

    #[test]
    #[serial]
    fn version_displays() {
        gr().arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("gr"));
    }

    #[test]
    #[serial]
    fn missing_package_is_usage_error() {
        gr().arg("-race").assert().code(2);
    }

    #[test]
    #[serial]
    fn unsupported_flag_is_usage_error() {
        gr().args(["-tags", "netgo", "./cmd/x"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("not (yet) supported"));
    }

    #[test]
    #[serial]
    fn unknown_flag_is_usage_error() {
        gr().args(["-frobnicate", "./cmd/x"]).assert().code(2);
    }
}

#[cfg(unix)]
mod run_tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use serial_test::serial;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Stand-in for the Go toolchain. It logs every invocation and "builds" a
    /// package by copying its run.sh to the output path, atomically.
    const FAKE_GO: &str = r#"#!/bin/sh
echo "build $(pwd) $*" >> "$GR_TEST_LOG"
out=""
while [ $# -gt 0 ]; do
    case "$1" in
        -o) out="$2"; shift 2 ;;
        *) shift ;;
    esac
done
if grep -q SYNTAX_ERROR *.go; then
    echo "main.go:1:1: syntax error" >&2
    exit 1
fi
tmp="$out.tmp.$$"
cp run.sh "$tmp"
chmod 755 "$tmp"
mv "$tmp" "$out"
"#;

    const RUN_SH: &str = "#!/bin/sh\necho \"hello args: $*\"\nexit ${EXIT_CODE:-0}\n";

    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let sandbox = Self {
                dir: TempDir::new().unwrap(),
            };
            sandbox.write("bin/go", FAKE_GO);
            fs::set_permissions(sandbox.path("bin/go"), fs::Permissions::from_mode(0o755)).unwrap();
            fs::create_dir_all(sandbox.path("home")).unwrap();
            sandbox
        }

        /// A module with a single main package and the fake build output
        fn hello(&self) -> &Self {
            self.write("hello/go.mod", "module example.com/hello\n\ngo 1.22\n");
            self.write(
                "hello/main.go",
                "package main\n\nimport \"fmt\"\n\nfunc main() { fmt.Println(\"hello\") }\n",
            );
            self.write("hello/run.sh", RUN_SH);
            self
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn write(&self, rel: &str, contents: &str) {
            let path = self.path(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        fn configure(cmd: &mut std::process::Command, root: &Path) {
            cmd.current_dir(root)
                .env("GO", root.join("bin/go"))
                .env("GR_TEST_LOG", root.join("builds.log"))
                .env("HOME", root.join("home"))
                .env("XDG_CACHE_HOME", root.join("cache"))
                .env("XDG_CONFIG_HOME", root.join("config"))
                .env_remove("GR_CONFIG")
                .env_remove("GR_LOG")
                .env_remove("EXIT_CODE");
            for name in ["GOOS", "GOARCH", "CGO_ENABLED", "GOFLAGS"] {
                cmd.env_remove(name);
            }
        }

        fn command(&self) -> std::process::Command {
            let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_gr"));
            Self::configure(&mut cmd, self.dir.path());
            cmd
        }

        fn gr(&self) -> Command {
            Command::from_std(self.command())
        }

        fn builds(&self) -> Vec<String> {
            fs::read_to_string(self.path("builds.log"))
                .map(|log| log.lines().map(str::to_string).collect())
                .unwrap_or_default()
        }

        fn entries(&self, package: &str) -> Vec<PathBuf> {
            let package = fs::canonicalize(self.path(package)).unwrap();
            let mut dir = self.path("cache/gr/exe");
            dir.extend(package.components().skip(1));
            let mut entries: Vec<PathBuf> = fs::read_dir(dir)
                .map(|rd| rd.map(|e| e.unwrap().path()).collect())
                .unwrap_or_default();
            entries.sort();
            entries
        }
    }

    #[test]
    #[serial]
    fn second_run_reuses_cached_executable() {
        let sb = Sandbox::new();
        sb.hello();

        sb.gr()
            .args(["./hello", "a", "-b"])
            .assert()
            .success()
            .stdout(predicate::str::contains("hello args: a -b"));
        sb.gr()
            .args(["./hello", "c"])
            .assert()
            .success()
            .stdout(predicate::str::contains("hello args: c"));

        assert_eq!(sb.builds().len(), 1);
        assert_eq!(sb.entries("hello").len(), 1);
    }

    #[test]
    #[serial]
    fn compiler_gets_fixed_arguments_and_flags() {
        let sb = Sandbox::new();
        sb.hello();

        sb.gr().args(["-race", "-ldflags", "-s -w", "./hello"]).assert().success();

        let builds = sb.builds();
        assert_eq!(builds.len(), 1);
        assert!(builds[0].contains("build -trimpath -buildvcs=false -o "), "{}", builds[0]);
        assert!(builds[0].ends_with(" -race -ldflags -s -w"), "{}", builds[0]);
    }

    #[test]
    #[serial]
    fn source_change_rebuilds() {
        let sb = Sandbox::new();
        sb.hello();

        sb.gr().arg("./hello").assert().success();
        sb.write("hello/main.go", "package main\n\nfunc main() {}\n");
        sb.gr().arg("./hello").assert().success();

        assert_eq!(sb.builds().len(), 2);
    }

    #[test]
    #[serial]
    fn unrelated_files_do_not_rebuild() {
        let sb = Sandbox::new();
        sb.hello();

        sb.gr().arg("./hello").assert().success();
        sb.write("hello/README.md", "docs\n");
        sb.write("hello/main_test.go", "package main\n");
        sb.gr().arg("./hello").assert().success();

        assert_eq!(sb.builds().len(), 1);
    }

    #[test]
    #[serial]
    fn flags_and_tracked_environment_rebuild() {
        let sb = Sandbox::new();
        sb.hello();

        sb.gr().arg("./hello").assert().success();
        sb.gr().arg("./hello").env("SOME_UNTRACKED_VAR", "1").assert().success();
        sb.gr().args(["-race", "./hello"]).assert().success();
        sb.gr().arg("./hello").env("CGO_ENABLED", "0").assert().success();

        assert_eq!(sb.builds().len(), 3);
    }

    #[test]
    #[serial]
    fn retention_keeps_two_entries() {
        let sb = Sandbox::new();
        sb.hello();

        for value in ["-X=a", "-X=b", "-X=c", "-X=d"] {
            sb.gr().args(["-ldflags", value, "./hello"]).assert().success();
        }
        assert_eq!(sb.entries("hello").len(), 2);

        // The latest build survived and is reused.
        sb.gr().args(["-ldflags", "-X=d", "./hello"]).assert().success();
        assert_eq!(sb.builds().len(), 4);
    }

    #[test]
    #[serial]
    fn configured_retention() {
        let sb = Sandbox::new();
        sb.hello();
        sb.write("gr.toml", "[cache]\nkeep_entries = 1\n");

        for value in ["-X=a", "-X=b", "-X=c"] {
            sb.gr()
                .args(["-config", "gr.toml", "-ldflags", value, "./hello"])
                .assert()
                .success();
        }
        assert_eq!(sb.entries("hello").len(), 1);
    }

    #[test]
    #[serial]
    fn exit_status_passes_through() {
        let sb = Sandbox::new();
        sb.hello();

        sb.gr().arg("./hello").env("EXIT_CODE", "3").assert().code(3);
        // Cached run behaves the same.
        sb.gr().arg("./hello").env("EXIT_CODE", "3").assert().code(3);
    }

    #[test]
    #[serial]
    fn build_failure_is_fatal() {
        let sb = Sandbox::new();
        sb.hello();
        sb.write("hello/main.go", "package main\n\n// SYNTAX_ERROR\nfunc main() {}\n");

        sb.gr()
            .arg("./hello")
            .assert()
            .code(255)
            .stderr(predicate::str::contains("failed to build program"))
            .stderr(predicate::str::contains("syntax error"));
        assert!(sb.entries("hello").is_empty());
    }

    #[test]
    #[serial]
    fn missing_module_is_fatal() {
        let sb = Sandbox::new();
        sb.write("orphan/main.go", "package main\n");

        sb.gr()
            .arg("./orphan")
            .assert()
            .code(255)
            .stderr(predicate::str::contains("failed to find go.mod anywhere upwards of"));
        assert!(sb.builds().is_empty());
    }

    #[test]
    #[serial]
    fn empty_embed_directory_is_fatal() {
        let sb = Sandbox::new();
        sb.hello();
        sb.write(
            "hello/main.go",
            "package main\n\nimport _ \"embed\"\n\n//go:embed static\nvar static []byte\n\nfunc main() {}\n",
        );
        sb.write("hello/static/.gitkeep", "");

        sb.gr()
            .arg("./hello")
            .assert()
            .code(255)
            .stderr(predicate::str::contains("contains no embeddable files"));
        assert!(sb.builds().is_empty());
    }

    #[test]
    #[serial]
    fn embedded_file_change_rebuilds() {
        let sb = Sandbox::new();
        sb.hello();
        sb.write(
            "hello/main.go",
            "package main\n\nimport \"embed\"\n\n//go:embed static\nvar static embed.FS\n\nfunc main() {}\n",
        );
        sb.write("hello/static/index.html", "<p>one</p>");

        sb.gr().arg("./hello").assert().success();
        sb.write("hello/static/index.html", "<p>two</p>");
        sb.gr().arg("./hello").assert().success();

        assert_eq!(sb.builds().len(), 2);
    }

    #[test]
    #[serial]
    fn replaced_module_change_rebuilds() {
        let sb = Sandbox::new();
        sb.hello();
        sb.write(
            "hello/go.mod",
            "module example.com/hello\n\nrequire example.com/lib v0.0.0\n\nreplace example.com/lib => ../lib\n",
        );
        sb.write(
            "hello/main.go",
            "package main\n\nimport \"example.com/lib\"\n\nfunc main() { lib.Hello() }\n",
        );
        sb.write("lib/go.mod", "module example.com/lib\n");
        sb.write("lib/lib.go", "package lib\n\nfunc Hello() {}\n");

        sb.gr().arg("./hello").assert().success();
        sb.write("lib/lib.go", "package lib\n\nfunc Hello() { println() }\n");
        sb.gr().arg("./hello").assert().success();
        sb.write("lib/unused.txt", "not a source file\n");
        sb.gr().arg("./hello").assert().success();

        assert_eq!(sb.builds().len(), 2);
    }

    #[test]
    #[serial]
    fn concurrent_cold_runs_build_once() {
        let sb = Sandbox::new();
        sb.hello();

        let spawn = || {
            sb.command()
                .arg("./hello")
                .stdout(std::process::Stdio::null())
                .spawn()
                .unwrap()
        };
        let first = spawn();
        let second = spawn();

        assert!(first.wait_with_output().unwrap().status.success());
        assert!(second.wait_with_output().unwrap().status.success());
        assert_eq!(sb.builds().len(), 1);
        assert_eq!(sb.entries("hello").len(), 1);
    }
}
