#![cfg(test)]
mod pipeline;
mod shutdown;
