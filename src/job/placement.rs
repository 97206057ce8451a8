use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;
use walkdir::WalkDir;

/// Where the packet generator leaves its output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PacketLayout {
    /// One directory that becomes the job's target directory
    Directory(PathBuf),
    /// Named files inside the generator's working directory
    Files { source_dir: PathBuf, names: Vec<String> },
}

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("Packet directory {} is missing", .0.display())]
    MissingDirectory(PathBuf),
    #[error("File for submission {} is missing", .0.display())]
    MissingFile(PathBuf),
    #[error("Can't find {} in the placed packet", .0.display())]
    MissingExecutable(PathBuf),
    #[error("Can't move {} to {}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Can't replace existing target directory {}", path.display())]
    ReplaceTarget {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Can't create target directory {}", path.display())]
    CreateTarget {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Move a freshly generated packet into `target_dir`
///
/// Sources are moved, not copied: after a successful placement they no longer exist where the
/// generator wrote them. In directory mode a target left over from an earlier run is replaced.
/// In file mode every named file is checked before anything is moved.
pub fn place(layout: &PacketLayout, target_dir: &Path) -> Result<(), PlacementError> {
    match layout {
        PacketLayout::Directory(source) => {
            if !source.is_dir() {
                return Err(PlacementError::MissingDirectory(source.clone()));
            }
            if target_dir.exists() {
                warn!("Job directory {} already exists, replacing it", target_dir.display());
                fs::remove_dir_all(target_dir).map_err(|source| PlacementError::ReplaceTarget {
                    path: target_dir.to_path_buf(),
                    source,
                })?;
            }
            if let Some(parent) = target_dir.parent() {
                create_dir(parent)?;
            }
            info!("Moving packet directory {} to {}", source.display(), target_dir.display());
            move_path(source, target_dir)
        }
        PacketLayout::Files { source_dir, names } => {
            let sources: Vec<PathBuf> = names.iter().map(|name| source_dir.join(name)).collect();
            if let Some(missing) = sources.iter().find(|path| !path.is_file()) {
                return Err(PlacementError::MissingFile(missing.clone()));
            }
            create_dir(target_dir)?;
            for (source, name) in sources.iter().zip(names) {
                debug!("Moving {} to {}", source.display(), target_dir.display());
                move_path(source, &target_dir.join(name))?;
            }
            info!("Moved {} packet files to {}", names.len(), target_dir.display());
            Ok(())
        }
    }
}

/// The launch script runs `executable` from the target directory, so it has to be there
pub fn check_executable(target_dir: &Path, executable: &str) -> Result<PathBuf, PlacementError> {
    let path = target_dir.join(executable);
    match path.exists() {
        true => Ok(path),
        false => Err(PlacementError::MissingExecutable(path)),
    }
}

fn create_dir(path: &Path) -> Result<(), PlacementError> {
    fs::create_dir_all(path).map_err(|source| PlacementError::CreateTarget {
        path: path.to_path_buf(),
        source,
    })
}

fn move_path(from: &Path, to: &Path) -> Result<(), PlacementError> {
    let moved = fs::rename(from, to).or_else(|err| {
        debug!("Can't rename {} ({}), copying instead", from.display(), err);
        copy_then_remove(from, to)
    });
    moved.map_err(|source| PlacementError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Fallback for renames that can't work, e.g. across filesystems
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    if !from.is_dir() {
        fs::copy(from, to)?;
        return fs::remove_file(from);
    }

    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let dest = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    fs::remove_dir_all(from)
}
