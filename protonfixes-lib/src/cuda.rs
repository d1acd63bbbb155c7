//! libcuda binary patch for DLSS titles
//!
//! Some games crash when libcuda initializes while DLSS is active:
//! libcuda allocates memory in an area the game already uses, and the
//! DXVK/VKD3D workaround of dropping the VK_NVX extensions disables DLSS.
//! Widening the allowed allocation area inside libcuda.so avoids the
//! failure while keeping the extensions.

use crate::session::Session;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, error, info, warn};

/// Allocation mask as shipped in libcuda.so
const MASK_ORIG: [u8; 8] = [0x00, 0x00, 0x00, 0xf8, 0xff, 0x00, 0x00, 0x00];

/// Widened allocation mask
const MASK_PATCHED: [u8; 8] = [0x00, 0x00, 0x00, 0xf8, 0xff, 0xff, 0x00, 0x00];

/// Patch libcuda.so and preload the patched copy.
///
/// The patched library is rewritten under `~/.cache/protonfixes` at every
/// launch. Returns whether the library was patched and `LD_PRELOAD` set.
pub fn patch_libcuda(session: &mut Session) -> bool {
    let Some(cache_dir) = dirs::cache_dir().map(|dir| dir.join("protonfixes")) else {
        warn!("Could not determine cache directory.");
        return false;
    };
    if let Err(err) = std::fs::create_dir_all(&cache_dir) {
        warn!("Could not create {:?}: {}", cache_dir, err);
        return false;
    }

    let Some(libcuda_path) = find_libcuda() else {
        return false;
    };
    info!("Found 64-bit libcuda.so at: {:?}", libcuda_path);

    let binary = match std::fs::read(&libcuda_path) {
        Ok(binary) => binary,
        Err(err) => {
            error!("Unable to read libcuda.so: {}", err);
            return false;
        }
    };

    let patched = patch_allocation_mask(&binary);
    let patched_library = cache_dir.join("libcuda.patched.so");
    if let Err(err) = std::fs::write(&patched_library, patched) {
        error!(
            "Unable to write patched libcuda.so to {:?}: {}",
            patched_library, err
        );
        return false;
    }
    if let Err(err) =
        std::fs::set_permissions(&patched_library, std::fs::Permissions::from_mode(0o755))
    {
        error!("Unable to set permissions on {:?}: {}", patched_library, err);
        return false;
    }
    debug!("Permissions set to rwxr-xr-x for {:?}", patched_library);

    info!("Patched libcuda.so saved to: {:?}", patched_library);
    session.set_env("LD_PRELOAD", &patched_library.to_string_lossy());
    true
}

/// Locate the 64-bit libcuda.so through ldconfig.
fn find_libcuda() -> Option<PathBuf> {
    let ldconfig = match which::which("ldconfig") {
        Ok(path) => path,
        Err(_) => {
            warn!("ldconfig not found in PATH.");
            return None;
        }
    };

    let output = match Command::new(&ldconfig).arg("-p").output() {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            warn!("Error running ldconfig: exit {:?}", output.status.code());
            return None;
        }
        Err(err) => {
            warn!("Error running ldconfig: {}", err);
            return None;
        }
    };

    let listing = String::from_utf8_lossy(&output.stdout);
    for line in listing.lines() {
        if line.contains("libcuda.so") && line.contains("x86-64") {
            if let Some((_, path)) = line.split_once(" => ") {
                let path = PathBuf::from(path.trim());
                if path.exists() {
                    return path.canonicalize().ok();
                }
            }
        }
    }

    warn!("libcuda.so not found as a 64-bit library in ldconfig output.");
    None
}

/// Replace every byte-aligned occurrence of the allocation mask.
fn patch_allocation_mask(binary: &[u8]) -> Vec<u8> {
    let mut out = binary.to_vec();
    if binary.len() < MASK_ORIG.len() {
        return out;
    }
    let mut i = 0;
    while i + MASK_ORIG.len() <= out.len() {
        if out[i..i + MASK_ORIG.len()] == MASK_ORIG {
            out[i..i + MASK_PATCHED.len()].copy_from_slice(&MASK_PATCHED);
            i += MASK_ORIG.len();
        } else {
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_mask_is_widened() {
        let mut binary = vec![0xab; 4];
        binary.extend_from_slice(&MASK_ORIG);
        binary.extend_from_slice(&[0xcd; 4]);

        let patched = patch_allocation_mask(&binary);
        assert_eq!(&patched[..4], &[0xab; 4]);
        assert_eq!(&patched[4..12], &MASK_PATCHED);
        assert_eq!(&patched[12..], &[0xcd; 4]);
    }

    #[test]
    fn untouched_binary_is_preserved() {
        let binary = vec![0x01, 0x02, 0x03, 0x04];
        assert_eq!(patch_allocation_mask(&binary), binary);
    }

    #[test]
    fn multiple_occurrences_are_all_patched() {
        let mut binary = Vec::new();
        binary.extend_from_slice(&MASK_ORIG);
        binary.push(0x77);
        binary.extend_from_slice(&MASK_ORIG);

        let patched = patch_allocation_mask(&binary);
        assert_eq!(&patched[..8], &MASK_PATCHED);
        assert_eq!(patched[8], 0x77);
        assert_eq!(&patched[9..], &MASK_PATCHED);
    }
}
