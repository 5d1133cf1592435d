// Copyright (c) 2026 flowforge contributors
// SPDX-License-Identifier: MIT

pub mod flow;
pub mod parameters;
