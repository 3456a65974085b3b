// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub(crate) mod principal;
pub(crate) mod site_config;
pub(crate) mod ticket;

pub use self::{
    clock::{Clock, MockClock, SystemClock},
    principal::{Claim, Identity, Principal, CLAIM_DESTINATION, CLAIM_SUBJECT},
    site_config::SiteConfig,
    ticket::{InvalidListValueError, Properties, Ticket, TicketUsage},
};
