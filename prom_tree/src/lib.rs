// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Firmware device tree writer.

mod propval;
mod tree;

pub use propval::FromPropval;
pub use propval::ToPropval;
pub use tree::Error;
pub use tree::PromNode;
pub use tree::PromTree;
pub use tree::Result;
