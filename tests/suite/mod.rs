mod bridge;
mod concurrency;
mod context_answers;
mod persistence;
mod properties;
mod scenarios;
