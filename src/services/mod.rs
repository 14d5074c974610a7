pub mod config_store;
pub mod detection;
pub mod oracle;

pub use config_store::{ConfigStore, DetectorConfig};
pub use detection::{DetectError, Detector, PerturbationDetector};
pub use oracle::{LikelihoodOracle, OracleError, RemoteOracle};
