mod cycle;
mod resolution;
mod setup;
