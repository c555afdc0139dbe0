// TvcTape
// Copyright (c) 2026 The TvcTape Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Structures shared by the two TvcTape pipelines: the common error type, the sample source
//! feeding the tape demodulator, the CAS container header pair, and the framing structures of
//! the cassette byte stream.

pub mod cas;
pub mod errors;
pub mod io;
pub mod tape;
