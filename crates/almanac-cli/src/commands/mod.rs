pub mod add;
pub mod calendar;
pub mod delete;
pub mod overrides;
pub mod refresh;
pub mod rules;
