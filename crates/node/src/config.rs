use std::collections::HashSet;
use std::fs;
use std::io;

use chord_core::consts::DEFAULT_ID_BITS;
use chord_core::dht::IdSpace;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::util::ensure_parent_dir;
use crate::util::expand_home;

pub const DEFAULT_CONFIG_PATH: &str = "~/.chord/config.yaml";
pub const DEFAULT_FIRST_PORT: u16 = 50000;
pub const DEFAULT_MEMBER_COUNT: u16 = 8;

fn default_id_bits() -> u16 {
    DEFAULT_ID_BITS as u16
}

fn default_verify() -> bool {
    true
}

/// One member of the simulated ring.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MemberConfig {
    pub address: String,
    /// Overrides the identifier derived from the address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Width `m` of the identifier space.
    #[serde(default = "default_id_bits")]
    pub id_bits: u16,
    /// The first member seeds the ring, the others join in order.
    pub members: Vec<MemberConfig>,
    /// Index of the member newcomers join through once it is on the ring.
    #[serde(default)]
    pub contact: usize,
    /// Check the whole ring against the oracle after each join.
    #[serde(default = "default_verify")]
    pub verify: bool,
    /// When there is no configuration in the YAML file,
    /// its deserialization is equivalent to `vec![]` in Rust.
    #[serde(default)]
    pub lookups: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_bits: default_id_bits(),
            members: (0..DEFAULT_MEMBER_COUNT)
                .map(|i| MemberConfig {
                    address: format!("127.0.0.1:{}", DEFAULT_FIRST_PORT + i),
                    did: None,
                })
                .collect(),
            contact: 0,
            verify: default_verify(),
            lookups: vec!["alice".to_string(), "bob".to_string()],
        }
    }
}

impl Config {
    pub fn space(&self) -> Result<IdSpace> {
        Ok(IdSpace::new(self.id_bits)?)
    }

    /// Reject configurations that cannot form a ring.
    pub fn validate(&self) -> Result<()> {
        self.space()?;
        if self.members.is_empty() {
            return Err(Error::EmptyRing);
        }
        if self.contact >= self.members.len() {
            return Err(Error::ContactOutOfRange(self.contact, self.members.len()));
        }
        let mut seen = HashSet::new();
        for m in self.members.iter() {
            if !seen.insert(m.address.as_str()) {
                return Err(Error::DuplicateAddress(m.address.clone()));
            }
        }
        Ok(())
    }

    pub fn write_fs<P>(&self, path: P) -> Result<String>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        ensure_parent_dir(&path)?;
        let f =
            fs::File::create(path.as_path()).map_err(|e| Error::CreateFileError(e.to_string()))?;
        let f_writer = io::BufWriter::new(f);
        serde_yaml::to_writer(f_writer, self).map_err(|_| Error::EncodeError)?;
        Ok(path.to_string_lossy().to_string())
    }

    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path).map_err(|e| Error::OpenFileError(e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        Ok(serde_yaml::from_reader(f_rdr)?)
    }
}
