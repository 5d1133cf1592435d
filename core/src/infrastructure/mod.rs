// Copyright (c) 2026 flowforge contributors
// SPDX-License-Identifier: MIT

pub mod serverless_client;
pub mod studio_client;
