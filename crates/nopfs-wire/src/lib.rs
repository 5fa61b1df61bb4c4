// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide 9P2000 wire types and codec primitives for nopfs servers and clients.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! 9P2000 wire types and codec primitives shared by the nopfs dispatch engine,
//! its TCP transport and test clients.

mod codec;
mod types;

pub use codec::{frame_size, Codec};
pub use types::*;
