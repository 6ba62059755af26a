//! # Prompt Template Modules
//!
//! This module organizes the prompt text used by the lookup assistant: the fixed
//! persona and dialect instructions (`tasks`) and the grounding prompt builder (`core`).

pub mod core;
pub mod tasks;
