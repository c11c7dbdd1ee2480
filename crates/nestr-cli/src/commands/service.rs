//! Per-user OS service registration.
//!
//! `install` writes a service definition that runs `<current exe> run` at
//! login: a systemd user unit on Linux, a launchd agent on macOS.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

const SYSTEMD_UNIT_NAME: &str = "nestr-key-agent.service";
const LAUNCHD_LABEL: &str = "com.gitnestr.key-agent";

/// Supported per-user service managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceManager {
    Systemd,
    Launchd,
}

impl ServiceManager {
    /// The service manager for this platform.
    pub fn current() -> anyhow::Result<Self> {
        if cfg!(target_os = "linux") {
            Ok(Self::Systemd)
        } else if cfg!(target_os = "macos") {
            Ok(Self::Launchd)
        } else {
            anyhow::bail!(
                "service installation is not supported on {}; \
                 run `nestr-key-agent run` under your own supervisor",
                std::env::consts::OS
            )
        }
    }

    /// Where the definition lives under `home`.
    pub fn definition_path(&self, home: &Path) -> PathBuf {
        match self {
            Self::Systemd => home
                .join(".config")
                .join("systemd")
                .join("user")
                .join(SYSTEMD_UNIT_NAME),
            Self::Launchd => home
                .join("Library")
                .join("LaunchAgents")
                .join(format!("{LAUNCHD_LABEL}.plist")),
        }
    }

    /// Render the definition for `exe`.
    pub fn render(&self, exe: &Path) -> String {
        match self {
            Self::Systemd => render_systemd_unit(exe),
            Self::Launchd => render_launchd_plist(exe),
        }
    }

    /// Command the user runs to start the installed service.
    pub fn enable_hint(&self, definition: &Path) -> String {
        match self {
            Self::Systemd => format!(
                "systemctl --user daemon-reload && \
                 systemctl --user enable --now {SYSTEMD_UNIT_NAME}"
            ),
            Self::Launchd => format!("launchctl load -w {}", definition.display()),
        }
    }

    /// Command the user runs before removing the definition.
    pub fn disable_hint(&self, definition: &Path) -> String {
        match self {
            Self::Systemd => format!("systemctl --user disable --now {SYSTEMD_UNIT_NAME}"),
            Self::Launchd => format!("launchctl unload -w {}", definition.display()),
        }
    }
}

fn render_systemd_unit(exe: &Path) -> String {
    format!(
        "[Unit]\n\
         Description=Nestr Key Agent\n\
         After=default.target\n\
         \n\
         [Service]\n\
         ExecStart=\"{}\" run\n\
         Restart=on-failure\n\
         \n\
         [Install]\n\
         WantedBy=default.target\n",
        exe.display()
    )
}

fn render_launchd_plist(exe: &Path) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LAUNCHD_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{}</string>
        <string>run</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <true/>
</dict>
</plist>
"#,
        xml_escape(&exe.display().to_string())
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Write the definition for `exe` under `home`, replacing any previous one.
pub fn install_into(manager: ServiceManager, home: &Path, exe: &Path) -> anyhow::Result<PathBuf> {
    let path = manager.definition_path(home);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, manager.render(exe))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Delete the definition under `home`. Returns `false` if none was installed.
pub fn remove_from(manager: ServiceManager, home: &Path) -> anyhow::Result<bool> {
    let path = manager.definition_path(home);
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}

fn home_dir() -> anyhow::Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Install the service for the current executable.
pub fn install() -> anyhow::Result<()> {
    let manager = ServiceManager::current()?;
    let exe = std::env::current_exe().context("failed to resolve current executable")?;
    let path = install_into(manager, &home_dir()?, &exe)?;

    println!("Installed service definition at {}", path.display());
    println!("Start it with:");
    println!("  {}", manager.enable_hint(&path));
    Ok(())
}

/// Remove the installed service definition.
pub fn remove() -> anyhow::Result<()> {
    let manager = ServiceManager::current()?;
    let home = home_dir()?;
    let path = manager.definition_path(&home);

    if remove_from(manager, &home)? {
        println!("Removed {}", path.display());
        println!("If the agent is still running, stop it with:");
        println!("  {}", manager.disable_hint(&path));
    } else {
        println!("No service definition found at {}", path.display());
    }
    Ok(())
}
