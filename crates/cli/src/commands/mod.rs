// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod convert;
pub mod inspect;
pub mod verify;
