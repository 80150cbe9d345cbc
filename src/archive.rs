use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use zip::read::ZipFile;
use zip::ZipArchive;

use crate::config::SourceEncoding;
use crate::error::{ImportError, ImportResult};

pub const FOOD_DES: &str = "FOOD_DES.txt";
pub const FD_GROUP: &str = "FD_GROUP.txt";
pub const NUT_DATA: &str = "NUT_DATA.txt";
pub const NUTR_DEF: &str = "NUTR_DEF.txt";
pub const SRC_CD: &str = "SRC_CD.txt";
pub const DERIV_CD: &str = "DERIV_CD.txt";
pub const WEIGHT: &str = "WEIGHT.txt";
pub const FOOTNOTE: &str = "FOOTNOTE.txt";
pub const DATSRCLN: &str = "DATSRCLN.txt";
pub const DATA_SRC: &str = "DATA_SRC.txt";

/// Members every distribution must carry, in the order they are reported
/// when missing.
pub const REQUIRED_MEMBERS: [&str; 10] = [
    FOOD_DES, FD_GROUP, NUT_DATA, NUTR_DEF, SRC_CD, DERIV_CD, WEIGHT, FOOTNOTE, DATSRCLN, DATA_SRC,
];

/// An opened SR distribution whose required members have been verified.
pub struct SrArchive {
    path: PathBuf,
    zip: ZipArchive<File>,
    encoding: SourceEncoding,
}

impl std::fmt::Debug for SrArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrArchive")
            .field("path", &self.path)
            .field("members", &self.zip.len())
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl SrArchive {
    pub fn open(path: impl AsRef<Path>, encoding: SourceEncoding) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ImportError::ArchiveNotFound {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).map_err(|err| ImportError::ArchiveCorrupt {
            path: path.to_path_buf(),
            source: err.into(),
        })?;
        let zip = ZipArchive::new(file).map_err(|err| ImportError::ArchiveCorrupt {
            path: path.to_path_buf(),
            source: err,
        })?;

        let missing = missing_members(zip.file_names());
        if !missing.is_empty() {
            tracing::error!(
                target: "usda_import",
                event = "archive_missing_members",
                path = %path.display(),
                missing = %missing.join(", ")
            );
            return Err(ImportError::MissingMembers(missing));
        }

        tracing::info!(
            target: "usda_import",
            event = "archive_verified",
            path = %path.display(),
            members = zip.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            zip,
            encoding,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    /// Lazily decoded lines of one member, without line terminators.
    pub fn member_lines(&mut self, member: &'static str) -> ImportResult<MemberLines<'_>> {
        let encoding = self.encoding;
        let path = self.path.clone();
        let file = self.zip.by_name(member).map_err(|err| match err {
            zip::result::ZipError::FileNotFound => {
                ImportError::MissingMembers(vec![member.to_string()])
            }
            other => ImportError::ArchiveCorrupt {
                path,
                source: other,
            },
        })?;
        Ok(MemberLines {
            member,
            reader: BufReader::new(file),
            encoding,
            buf: Vec::new(),
            done: false,
        })
    }

    /// Every line of one member, materialized.
    pub fn read_member(&mut self, member: &'static str) -> ImportResult<Vec<String>> {
        self.member_lines(member)?.collect()
    }
}

fn missing_members<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let present: Vec<&str> = names.collect();
    REQUIRED_MEMBERS
        .iter()
        .filter(|required| !present.contains(required))
        .map(|required| required.to_string())
        .collect()
}

pub struct MemberLines<'a> {
    member: &'static str,
    reader: BufReader<ZipFile<'a>>,
    encoding: SourceEncoding,
    buf: Vec<u8>,
    done: bool,
}

impl Iterator for MemberLines<'_> {
    type Item = ImportResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                }
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
                Some(Ok(self.encoding.decode(&self.buf)))
            }
            Err(source) => {
                self.done = true;
                Some(Err(ImportError::MemberRead {
                    member: self.member,
                    source,
                }))
            }
        }
    }
}
