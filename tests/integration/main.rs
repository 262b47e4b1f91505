//! Integration tests for Image-Harvest

mod harvest_flow;
