//! Shell-script stand-ins for the yt-dlp executable (Unix only)

use std::path::{Path, PathBuf};
use vkvideo_dl::config::EngineConfig;

/// Write an executable `/bin/sh` script named `yt-dlp` into `dir`
///
/// The script records its arguments, one per line, in `dir/args.txt` before
/// running `body`.
#[cfg(unix)]
pub fn write_fake_ytdlp(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("yt-dlp");
    let args_file = dir.join("args.txt");
    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\n{}\n",
        args_file.display(),
        body
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Arguments the fake script was invoked with
pub fn recorded_args(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("args.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Engine settings that only ever use `binary`
pub fn config_for(binary: &Path) -> EngineConfig {
    EngineConfig {
        binary_path: Some(binary.to_path_buf()),
        search_path: false,
        auto_install: false,
        install_dir: binary
            .parent()
            .map(|p| p.join("install"))
            .unwrap_or_default(),
        ..EngineConfig::default()
    }
}
