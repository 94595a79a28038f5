//! Server binary selection.
//!
//! The dedicated server ships a 64-bit and a 32-bit launcher, each expecting
//! the matching bundled JRE and native libraries on the loader path. The
//! installed `java` decides which one to run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Architecture reported by the JVM banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaArch {
    Amd64,
    I386,
}

impl JavaArch {
    /// Pointer width as printed in the `-bit java detected` notice.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Amd64 => 64,
            Self::I386 => 32,
        }
    }
}

impl fmt::Display for JavaArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Parse the output of `java -version`.
pub fn parse_java_arch(banner: &str) -> Option<JavaArch> {
    let banner = banner.to_lowercase();
    if banner.contains("64-bit") {
        Some(JavaArch::Amd64)
    } else if banner.contains("32-bit") {
        Some(JavaArch::I386)
    } else {
        None
    }
}

/// Run `<java_bin> -version` and work out which server build to use.
///
/// Returns `Ok(None)` when the JVM ran but its banner names no architecture.
pub async fn detect_java_arch(java_bin: &Path) -> Result<Option<JavaArch>> {
    let output = Command::new(java_bin)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            Error::Platform(format!("Failed to run {} -version: {e}", java_bin.display()))
        })?;

    // The banner goes to stderr on every JVM we know of.
    let mut banner = String::from_utf8_lossy(&output.stdout).into_owned();
    banner.push_str(&String::from_utf8_lossy(&output.stderr));
    debug!(java = %java_bin.display(), status = ?output.status, "java -version finished");

    Ok(parse_java_arch(&banner))
}

/// Everything needed to spawn the server once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Variables set on the child only, on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl LaunchPlan {
    /// Launch an arbitrary program with the inherited environment.
    pub fn direct(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            env: Vec::new(),
        }
    }

    /// Build the plan for the bundled server matching `arch`.
    ///
    /// `base_env` looks up the wrapper's own environment; the values it
    /// returns are extended, never replaced.
    pub fn for_arch(
        install_dir: &Path,
        arch: JavaArch,
        args: Vec<String>,
        base_env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let dir = install_dir.display();
        let path = base_env("PATH").unwrap_or_default();
        let preload = base_env("LD_PRELOAD").unwrap_or_default();
        let ld_path = base_env("LD_LIBRARY_PATH").unwrap_or_default();

        let (executable, library_path) = match arch {
            JavaArch::Amd64 => (
                "ProjectZomboid64",
                format!("{dir}/linux64:{dir}/natives:{dir}:{dir}/jre64/lib/amd64:{ld_path}"),
            ),
            JavaArch::I386 => (
                "ProjectZomboid32",
                format!("{dir}/linux32:{dir}/natives:{dir}:{dir}/jre/lib/i386:{ld_path}"),
            ),
        };

        Self {
            program: install_dir.join(executable),
            args,
            working_dir: Some(install_dir.to_path_buf()),
            env: vec![
                ("PATH".to_string(), format!("{dir}/jre64/bin:{path}")),
                ("LD_PRELOAD".to_string(), format!("{preload}:libjsig.so")),
                ("LD_LIBRARY_PATH".to_string(), library_path),
            ],
        }
    }
}

impl fmt::Display for LaunchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    fn env_value<'a>(plan: &'a LaunchPlan, key: &str) -> Option<&'a str> {
        plan.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn parses_64_bit_banner() {
        let banner = "openjdk version \"17.0.2\"\nOpenJDK 64-Bit Server VM (build 17.0.2+8)";
        assert_eq!(parse_java_arch(banner), Some(JavaArch::Amd64));
    }

    #[test]
    fn parses_32_bit_banner() {
        let banner = "java version \"1.8.0_202\"\nJava HotSpot(TM) Client VM 32-BIT";
        assert_eq!(parse_java_arch(banner), Some(JavaArch::I386));
    }

    #[test]
    fn unknown_banner_is_none() {
        assert_eq!(parse_java_arch("java version \"1.8.0\""), None);
        assert_eq!(parse_java_arch(""), None);
    }

    #[test]
    fn arch_bits() {
        assert_eq!(JavaArch::Amd64.to_string(), "64");
        assert_eq!(JavaArch::I386.to_string(), "32");
    }

    #[test]
    fn amd64_plan_extends_environment() {
        let plan = LaunchPlan::for_arch(
            Path::new("/srv/pz"),
            JavaArch::Amd64,
            vec!["-servername".into(), "main".into()],
            env_of(&[("PATH", "/usr/bin"), ("LD_LIBRARY_PATH", "/opt/lib")]),
        );

        assert_eq!(plan.program, PathBuf::from("/srv/pz/ProjectZomboid64"));
        assert_eq!(plan.working_dir.as_deref(), Some(Path::new("/srv/pz")));
        assert_eq!(env_value(&plan, "PATH"), Some("/srv/pz/jre64/bin:/usr/bin"));
        assert_eq!(env_value(&plan, "LD_PRELOAD"), Some(":libjsig.so"));
        assert_eq!(
            env_value(&plan, "LD_LIBRARY_PATH"),
            Some("/srv/pz/linux64:/srv/pz/natives:/srv/pz:/srv/pz/jre64/lib/amd64:/opt/lib")
        );
        assert_eq!(
            plan.to_string(),
            "/srv/pz/ProjectZomboid64 -servername main"
        );
    }

    #[test]
    fn i386_plan_uses_32_bit_paths() {
        let plan = LaunchPlan::for_arch(
            Path::new("/srv/pz"),
            JavaArch::I386,
            Vec::new(),
            env_of(&[("LD_PRELOAD", "libfoo.so")]),
        );

        assert_eq!(plan.program, PathBuf::from("/srv/pz/ProjectZomboid32"));
        assert_eq!(env_value(&plan, "LD_PRELOAD"), Some("libfoo.so:libjsig.so"));
        assert_eq!(
            env_value(&plan, "LD_LIBRARY_PATH"),
            Some("/srv/pz/linux32:/srv/pz/natives:/srv/pz:/srv/pz/jre/lib/i386:")
        );
    }

    #[test]
    fn direct_plan_inherits_environment() {
        let plan = LaunchPlan::direct("/bin/sh", vec!["-c".into(), "true".into()]);
        assert!(plan.env.is_empty());
        assert!(plan.working_dir.is_none());
        assert_eq!(plan.to_string(), "/bin/sh -c true");
    }

    #[tokio::test]
    async fn missing_java_is_platform_error() {
        let err = detect_java_arch(Path::new("/nonexistent/bin/java"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Platform(_)));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn detects_arch_from_stderr_banner() {
        let dir = tempfile::tempdir().unwrap();
        let fake_java = dir.path().join("java");
        std::fs::write(
            &fake_java,
            "#!/bin/sh\necho 'OpenJDK 64-Bit Server VM' >&2\n",
        )
        .unwrap();
        let mut perms = std::fs::metadata(&fake_java).unwrap().permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
        std::fs::set_permissions(&fake_java, perms).unwrap();

        let arch = detect_java_arch(&fake_java).await.unwrap();
        assert_eq!(arch, Some(JavaArch::Amd64));
    }
}
