use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use tempfile::NamedTempFile;

/// Reads a whole text file into memory.
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents)
}

/// Replaces `path` with `bytes` in one step.
///
/// The bytes are written to a temporary file in the same directory which is
/// then renamed over the target, so a reader never sees a half-written file.
pub(crate) fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
	let path = path.as_ref();
	let parent = match path.parent() {
		Some(p) if !p.as_os_str().is_empty() => p,
		_ => Path::new("."),
	};
	fs::create_dir_all(parent)?;

	let mut temp_file = NamedTempFile::new_in(parent)?;
	temp_file.write_all(bytes)?;
	temp_file.flush()?;
	temp_file.persist(path).map_err(|e| e.error)?;
	Ok(())
}

/// Path of a file sitting next to `path` with another extension.
///
/// `data/lunch.txt` + `"json"` → `data/lunch.json`
pub(crate) fn sibling_path<P: AsRef<Path>>(path: P, extension: &str) -> PathBuf {
	path.as_ref().with_extension(extension)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/lunch.txt"` → `"lunch"`
/// - `"lunch.txt"` → `"lunch"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder<P: AsRef<Path>>(input: P) -> PathBuf {
	let input = input.as_ref();
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sibling_path_swaps_extension() {
		assert_eq!(sibling_path("data/lunch.txt", "json"), PathBuf::from("data/lunch.json"));
		assert_eq!(sibling_path("lunch", "bin"), PathBuf::from("lunch.bin"));
	}

	#[test]
	fn filename_drops_folder_and_extension() {
		assert_eq!(get_filename("./data/lunch.txt").unwrap(), "lunch");
		assert_eq!(get_filename("lunch").unwrap(), "lunch");
	}

	#[test]
	fn atomic_write_then_list() {
		let dir = tempfile::tempdir().unwrap();
		write_atomic(dir.path().join("b.txt"), b"two").unwrap();
		write_atomic(dir.path().join("a.txt"), b"one").unwrap();
		write_atomic(dir.path().join("c.json"), b"{}").unwrap();

		assert_eq!(list_files(dir.path(), "txt").unwrap(), vec!["a.txt", "b.txt"]);
		assert_eq!(read_file(dir.path().join("a.txt")).unwrap(), "one");
	}
}
