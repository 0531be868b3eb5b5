//! Seasonal rainfall forecasting.
//!
//! Ranks calendar months by historical rainfall to find the wet season,
//! min-max scales the training slice of the history, fits a seasonal ARIMA
//! model, forecasts forward day by day and splits the forecast into
//! in-season and out-of-season subsets.

pub mod engine;
pub mod optimizer;
pub mod partition;
pub mod sarima;
pub mod scaling;
pub mod season;
pub mod utility;
