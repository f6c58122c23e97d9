//! Local system facts exposed to templates and package lookups.
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of environment variables that become extra facts.
const FACT_ENV_PREFIX: &str = "KUZUSHI_FACT_";

/// Detected CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// 64-bit x86.
    X86_64,
    /// 32-bit x86.
    X86,
    /// 64-bit ARM.
    Aarch64,
    /// 32-bit ARM.
    Arm,
    /// Anything else; carries the Rust target name.
    Other(&'static str),
}

impl Arch {
    /// Detect the architecture this binary was built for.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_target(std::env::consts::ARCH)
    }

    fn from_target(arch: &'static str) -> Self {
        match arch {
            "x86_64" => Self::X86_64,
            "x86" => Self::X86,
            "aarch64" => Self::Aarch64,
            "arm" => Self::Arm,
            _ => Self::Other(arch),
        }
    }

    /// Debian architecture name used in `.deb` file names.
    #[must_use]
    pub const fn deb_arch(self) -> &'static str {
        match self {
            Self::X86_64 => "amd64",
            Self::X86 => "i386",
            Self::Aarch64 => "arm64",
            Self::Arm => "armhf",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
            Self::Aarch64 => "aarch64",
            Self::Arm => "arm",
            Self::Other(name) => *name,
        };
        write!(f, "{name}")
    }
}

/// Named facts about the local machine, keyed by lowercase name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facts {
    values: BTreeMap<String, String>,
}

impl Facts {
    /// Gather facts from the running system.
    ///
    /// Built-in facts are `hostname`, `os`, `arch`, `deb_arch` and `cpus`.
    /// Every `KUZUSHI_FACT_<NAME>` environment variable adds `<name>`.
    #[must_use]
    pub fn detect() -> Self {
        let arch = Arch::detect();
        let mut facts = Self::default()
            .with("hostname", detect_hostname())
            .with("os", std::env::consts::OS)
            .with("arch", arch.to_string())
            .with("deb_arch", arch.deb_arch())
            .with(
                "cpus",
                std::thread::available_parallelism()
                    .map_or(1, std::num::NonZeroUsize::get)
                    .to_string(),
            );
        for (key, value) in std::env::vars() {
            if let Some(name) = key.strip_prefix(FACT_ENV_PREFIX)
                && !name.is_empty()
            {
                facts = facts.with(&name.to_lowercase(), value);
            }
        }
        facts
    }

    /// Return a copy with `name` set to `value`.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Look up a fact by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Debian architecture of the host, falling back to the detected one.
    #[must_use]
    pub fn deb_arch(&self) -> &str {
        self.get("deb_arch").unwrap_or_else(|| Arch::detect().deb_arch())
    }
}

fn detect_hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .or_else(|_| std::fs::read_to_string("/etc/hostname"))
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deb_arch_names() {
        assert_eq!(Arch::X86_64.deb_arch(), "amd64");
        assert_eq!(Arch::X86.deb_arch(), "i386");
        assert_eq!(Arch::Aarch64.deb_arch(), "arm64");
        assert_eq!(Arch::Arm.deb_arch(), "armhf");
        assert_eq!(Arch::Other("riscv64").deb_arch(), "riscv64");
    }

    #[test]
    fn arch_from_target_name() {
        assert_eq!(Arch::from_target("x86_64"), Arch::X86_64);
        assert_eq!(Arch::from_target("aarch64"), Arch::Aarch64);
        assert_eq!(Arch::from_target("mips"), Arch::Other("mips"));
    }

    #[test]
    fn detect_populates_builtin_facts() {
        let facts = Facts::detect();
        for name in ["hostname", "os", "arch", "deb_arch", "cpus"] {
            assert!(facts.get(name).is_some(), "missing fact {name}");
        }
    }

    #[test]
    fn with_overrides_value() {
        let facts = Facts::default().with("deb_arch", "i386");
        assert_eq!(facts.deb_arch(), "i386");
        assert_eq!(facts.get("missing"), None);
    }
}
