use std::env;
use std::path::PathBuf;

use lazy_static::lazy_static;

// common configurations
lazy_static! {
    pub static ref PARALLEL: bool = matches!(env::var("LYRA_PARALLEL"), Ok(val) if val == "1");
    pub static ref PATH_ROOT: PathBuf = {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        assert!(path.pop());
        path
    };
    pub static ref PATH_STUDIO: PathBuf = PATH_ROOT.join("studio");
}
