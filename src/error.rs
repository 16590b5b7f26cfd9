// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Cannot read input file {}: {source}", path.display())]
    InputUnreadable { path: PathBuf, source: io::Error },

    #[error("Input file {} is not valid JSON: {source}", path.display())]
    MalformedJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unexpected conversation layout: {0}")]
    UnexpectedShape(String),

    #[error("Output path {} is the input file; refusing to overwrite it", path.display())]
    OutputIsInput { path: PathBuf },

    #[error("Cannot write output file {}: {source}", path.display())]
    OutputWrite { path: PathBuf, source: io::Error },
}
