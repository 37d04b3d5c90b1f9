#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use demucs_bridge::SeparatorConfig;

/// Bytes the happy-path stub writes for the target stem.
pub const TARGET_BYTES: &[u8] = b"stub target bytes";
/// Bytes the happy-path stub writes for the complement.
pub const RESIDUAL_BYTES: &[u8] = b"stub residual bytes";

/// A stand-in for the real tool: answers `--help`, records its argv next to
/// itself, and reproduces the expected output layout with fixed bytes.
pub const HAPPY_STUB: &str = r#"#!/bin/sh
if [ "$1" = "--help" ]; then
  echo "usage: fake-demucs [options] track"
  exit 0
fi
printf '%s\n' "$@" > "$(dirname "$0")/argv.txt"
out=""; model=""; stem=""; input=""; ext="wav"
while [ "$#" -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -n) model="$2"; shift 2 ;;
    --two-stems=*) stem="${1#--two-stems=}"; shift ;;
    --mp3) ext="mp3"; shift ;;
    --mp3-bitrate=*) shift ;;
    *) input="$1"; shift ;;
  esac
done
name=$(basename "$input"); name="${name%.*}"
dest="$out/$model/$name"
mkdir -p "$dest"
printf 'stub target bytes' > "$dest/$stem.$ext"
printf 'stub residual bytes' > "$dest/no_$stem.$ext"
"#;

/// Exits non-zero with a diagnostic on stderr, like a real failed run.
pub const FAIL_STUB: &str = r#"#!/bin/sh
echo "Traceback (most recent call last):" >&2
echo "ValueError: model weights for htdemucs2 not found" >&2
exit 3
"#;

/// Exits non-zero with the diagnostic on stdout and a silent stderr, like a
/// tool whose launcher swallows the error stream.
pub const STDOUT_FAIL_STUB: &str = r#"#!/bin/sh
echo "separation aborted: no usable GPU device"
exit 4
"#;

/// Exits zero without writing anything.
pub const SILENT_STUB: &str = "#!/bin/sh\nexit 0\n";

/// Never finishes on its own. `exec` so a kill reaches the sleeper itself
/// and the pipes close immediately.
pub const HANG_STUB: &str = "#!/bin/sh\nexec sleep 5\n";

/// Writes its scratch argument as the target bytes so concurrent calls can
/// prove they got distinct workspaces; sleeps long enough that two calls
/// overlap.
pub const WORKSPACE_ECHO_STUB: &str = r#"#!/bin/sh
out=""; model=""; stem=""; input=""; ext="wav"
while [ "$#" -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -n) model="$2"; shift 2 ;;
    --two-stems=*) stem="${1#--two-stems=}"; shift ;;
    --mp3) ext="mp3"; shift ;;
    --mp3-bitrate=*) shift ;;
    *) input="$1"; shift ;;
  esac
done
sleep 0.2
name=$(basename "$input"); name="${name%.*}"
dest="$out/$model/$name"
mkdir -p "$dest"
printf '%s' "$out" > "$dest/$stem.$ext"
printf 'residual of %s' "$name" > "$dest/no_$stem.$ext"
"#;

/// Succeeds like the happy-path stub but first floods both streams well past
/// the pipe buffer, so a runner that defers reading until after the child
/// exits would sit on a full pipe forever.
pub const CHATTY_STUB: &str = r#"#!/bin/sh
out=""; model=""; stem=""; input=""; ext="wav"
while [ "$#" -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -n) model="$2"; shift 2 ;;
    --two-stems=*) stem="${1#--two-stems=}"; shift ;;
    --mp3) ext="mp3"; shift ;;
    --mp3-bitrate=*) shift ;;
    *) input="$1"; shift ;;
  esac
done
i=0
while [ "$i" -lt 20000 ]; do
  echo "separating chunk $i of the mixture at full progress verbosity"
  echo "chunk $i residual energy within tolerance" >&2
  i=$((i+1))
done
name=$(basename "$input"); name="${name%.*}"
dest="$out/$model/$name"
mkdir -p "$dest"
printf 'stub target bytes' > "$dest/$stem.$ext"
printf 'stub residual bytes' > "$dest/no_$stem.$ext"
"#;

/// Write `body` as an executable script and return its path.
#[cfg(unix)]
pub fn write_stub(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-demucs.sh");
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Config that runs the stub instead of the real tool, with scratch
/// directories under `scratch` so tests can watch them disappear.
pub fn stub_config(stub: &Path, scratch: &Path) -> SeparatorConfig {
    SeparatorConfig {
        command: vec![stub.to_string_lossy().into_owned()],
        timeout: None,
        scratch_dir: Some(scratch.to_path_buf()),
    }
}

/// Number of entries in `dir`; zero when it does not exist.
pub fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|it| it.count()).unwrap_or(0)
}

/// A small fake input file for the stub to "separate".
pub fn write_input(dir: &Path, name: &str) -> PathBuf {
    let input = dir.join(name);
    fs::write(&input, b"not really audio").unwrap();
    input
}
