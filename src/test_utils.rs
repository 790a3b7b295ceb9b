//! Test utilities and global setup
//!
//! Provides centralized test logging configuration and other test helpers.

/// Test logging utilities
#[cfg(all(test, feature = "test-logging"))]
pub mod logging {
    use std::sync::Once;
    use tracing_subscriber::{EnvFilter, fmt};

    static INIT: Once = Once::new();

    /// Initialize test logging globally - safe to call multiple times
    ///
    /// This function sets up a test-friendly logger that:
    /// - Only initializes once per test run (using Once)
    /// - Respects RUST_LOG environment variable with sensible defaults
    /// - Uses test writer to avoid interfering with test output
    ///
    /// For automatic initialization in a test module:
    /// ```rust
    /// #[cfg(test)]
    /// mod tests {
    ///     // Auto-initialize logging for all tests in this module
    ///     #[cfg(feature = "test-logging")]
    ///     #[ctor::ctor]
    ///     fn init_test_logging() {
    ///         crate::test_utils::logging::init();
    ///     }
    /// }
    /// ```
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Run tests with trace-level logging for the collector only
    /// RUST_LOG=cpp_pch_pipeline::dependencies=trace cargo test --features test-logging
    /// ```
    pub fn init() {
        INIT.call_once(|| {
            let env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("debug,tokio=info"));

            fmt()
                .with_env_filter(env_filter)
                .with_test_writer() // Ensures logs don't interfere with test output
                .with_target(true) // Include module paths in logs
                .with_thread_ids(true) // Include thread IDs for async debugging
                .compact() // Use compact format for test readability
                .try_init()
                .ok(); // Ignore errors if already initialized by another test
        });
    }
}

/// On-disk C++ projects for end-to-end tests
#[cfg(test)]
pub mod integration {
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Small project with a compilation database, removed on drop
    ///
    /// ```text
    /// include/a.h      #include "b.h", consults WITH_B
    /// include/b.h
    /// sdk/sys.h        consults _GNU_SOURCE
    /// src/main.cpp     #include "a.h", <sys.h>
    /// src/util.cpp     #include "a.h", <sys.h>
    /// src/broken.cpp   #include "missing.h"   (separate project part)
    /// build/compile_commands.json
    /// ```
    pub struct TestProject {
        _temp_dir: TempDir, // Underscore prefix keeps it alive until drop
        pub root: PathBuf,
    }

    impl TestProject {
        pub fn new() -> Result<Self, std::io::Error> {
            let temp_dir = TempDir::new()?;
            let root = temp_dir.path().to_path_buf();
            let project = TestProject {
                _temp_dir: temp_dir,
                root,
            };

            project.write(
                "include/a.h",
                "#pragma once\n#include \"b.h\"\n#ifdef WITH_B\nint with_b();\n#endif\n",
            )?;
            project.write("include/b.h", "#pragma once\nint b();\n")?;
            project.write(
                "sdk/sys.h",
                "#ifndef SYS_H\n#define SYS_H\n#if defined(_GNU_SOURCE)\nint gnu();\n#endif\n#endif\n",
            )?;
            project.write(
                "src/main.cpp",
                "#include \"a.h\"\n#include <sys.h>\nint main() { return b(); }\n",
            )?;
            project.write(
                "src/util.cpp",
                "#include \"a.h\"\n#include <sys.h>\nint util() { return 0; }\n",
            )?;
            project.write("src/broken.cpp", "#include \"missing.h\"\n")?;
            project.write_compilation_database()?;
            Ok(project)
        }

        pub fn path(&self) -> &Path {
            &self.root
        }

        pub fn file(&self, relative: &str) -> PathBuf {
            self.root.join(relative)
        }

        pub fn build_dir(&self) -> PathBuf {
            self.root.join("build")
        }

        pub fn compilation_database(&self) -> PathBuf {
            self.build_dir().join("compile_commands.json")
        }

        pub fn write(&self, relative: &str, content: &str) -> Result<(), std::io::Error> {
            let path = self.file(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)
        }

        fn write_compilation_database(&self) -> Result<(), std::io::Error> {
            let build = self.build_dir();
            let entry = |source: &str, extra: &[&str]| {
                let mut arguments = vec![
                    "clang++".to_string(),
                    "-I../include".to_string(),
                    "-isystem".to_string(),
                    "../sdk".to_string(),
                    "-DWITH_B".to_string(),
                    "-D_GNU_SOURCE".to_string(),
                ];
                arguments.extend(extra.iter().map(|value| value.to_string()));
                arguments.extend([
                    "-c".to_string(),
                    format!("../{}", source),
                    "-o".to_string(),
                    format!("{}.o", source),
                ]);
                serde_json::json!({
                    "directory": build,
                    "file": format!("../{}", source),
                    "arguments": arguments,
                })
            };

            let database = serde_json::json!([
                entry("src/main.cpp", &[]),
                entry("src/util.cpp", &[]),
                entry("src/broken.cpp", &["-DBROKEN"]),
            ]);
            fs::create_dir_all(&build)?;
            fs::write(self.compilation_database(), database.to_string())
        }
    }
}
