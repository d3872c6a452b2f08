//! Taxi fare regression scenario
//!
//! Trips are read from comma separated text with a header, the fare is
//! copied to `Label`, the three categorical columns are one-hot encoded,
//! five columns are concatenated into `Features` and a [`TreeRegressor`]
//! is trained on them.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mlpipe_core::{
    Error, Evaluator, FieldKind, InputRecord, OutputRecord, Pipeline, RecordSchema, Result, TrainedModel, Validated,
    Value, ValueReader,
};
use mlpipe_readers::{TextLoader, TextLoaderOptions};
use mlpipe_trainers::{RegressionEvaluator, TreeRegressor, TreeRegressorConfig};
use mlpipe_transforms::{ColumnConcatenator, ColumnCopier, OneHotVectorizer};

use crate::registry;

/// Name the held-out root mean squared error is published under
pub const RMS_METRIC: &str = "rms";

/// Batch sizes of the batch prediction benchmarks
pub const BATCH_SIZES: [usize; 3] = [1, 2, 5];

/// One taxi trip, bound to columns 0 to 6 of the source text
#[derive(Debug, Clone, PartialEq)]
pub struct TaxiTrip {
    /// Vendor code such as `VTS` or `CMT`
    pub vendor_id: String,
    /// Rate code, categorical
    pub rate_code: String,
    /// Number of passengers
    pub passenger_count: f32,
    /// Trip time in seconds
    pub trip_time: f32,
    /// Trip distance in miles
    pub trip_distance: f32,
    /// Payment type such as `CRD` or `CSH`
    pub payment_type: String,
    /// Fare paid; the label
    pub fare_amount: f32,
}

impl TaxiTrip {
    /// The trip every prediction benchmark scores
    pub fn example() -> Self {
        Self {
            vendor_id: "VTS".to_string(),
            rate_code: "1".to_string(),
            passenger_count: 1.0,
            trip_time: 30.0,
            trip_distance: 1000.0,
            payment_type: "CRD".to_string(),
            fare_amount: 0.0,
        }
    }
}

impl InputRecord for TaxiTrip {
    fn record_schema() -> RecordSchema {
        RecordSchema::builder("TaxiTrip")
            .index("VendorId", 0, FieldKind::Text)
            .index("RateCode", 1, FieldKind::Text)
            .index("PassengerCount", 2, FieldKind::Numeric)
            .index("TripTime", 3, FieldKind::Numeric)
            .index("TripDistance", 4, FieldKind::Numeric)
            .index("PaymentType", 5, FieldKind::Text)
            .index("FareAmount", 6, FieldKind::Numeric)
            .build()
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.vendor_id.as_str()),
            Value::from(self.rate_code.as_str()),
            Value::Numeric(self.passenger_count),
            Value::Numeric(self.trip_time),
            Value::Numeric(self.trip_distance),
            Value::from(self.payment_type.as_str()),
            Value::Numeric(self.fare_amount),
        ]
    }
}

/// Predicted fare, read from the score column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FarePrediction {
    /// Predicted fare amount
    pub fare_amount: f32,
}

impl OutputRecord for FarePrediction {
    fn record_schema() -> RecordSchema {
        RecordSchema::builder("FarePrediction")
            .named("FareAmount", "Score", FieldKind::Numeric)
            .build()
    }

    fn from_values(values: Vec<Value>) -> Result<Self> {
        let mut reader = ValueReader::new("FarePrediction", values);
        Ok(Self {
            fare_amount: reader.numeric("FareAmount")?,
        })
    }
}

/// Generate plausible trips; the same seed always gives the same trips
pub fn synthetic_trips(rows: usize, seed: u64) -> Vec<TaxiTrip> {
    const VENDORS: [&str; 2] = ["VTS", "CMT"];
    const RATE_CODES: [(&str, f32); 3] = [("1", 1.0), ("2", 1.5), ("5", 2.2)];
    const PAYMENTS: [&str; 2] = ["CRD", "CSH"];

    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows)
        .map(|_| {
            let vendor = VENDORS[rng.gen_range(0..VENDORS.len())];
            let (rate_code, multiplier) = RATE_CODES[rng.gen_range(0..RATE_CODES.len())];
            let payment = PAYMENTS[rng.gen_range(0..PAYMENTS.len())];
            let passengers = rng.gen_range(1..=6) as f32;
            let distance: f32 = rng.gen_range(0.2..20.0);
            let time = distance * rng.gen_range(120.0..300.0);
            let noise: f32 = rng.gen_range(-0.5..0.5);
            let vendor_fee = if vendor == "CMT" { 0.5 } else { 0.0 };

            TaxiTrip {
                vendor_id: vendor.to_string(),
                rate_code: rate_code.to_string(),
                passenger_count: passengers,
                trip_time: time.round(),
                trip_distance: (distance * 100.0).round() / 100.0,
                payment_type: payment.to_string(),
                fare_amount: ((2.5 + 2.5 * distance + time / 300.0) * multiplier + vendor_fee + noise).max(2.5),
            }
        })
        .collect()
}

/// Write trips as comma separated text with a header line
pub fn write_trips(path: &Path, trips: &[TaxiTrip]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "vendor_id",
        "rate_code",
        "passenger_count",
        "trip_time_in_secs",
        "trip_distance",
        "payment_type",
        "fare_amount",
    ])?;
    for trip in trips {
        writer.write_record([
            trip.vendor_id.clone(),
            trip.rate_code.clone(),
            trip.passenger_count.to_string(),
            trip.trip_time.to_string(),
            trip.trip_distance.to_string(),
            trip.payment_type.clone(),
            trip.fare_amount.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Loader for a trips file written by [`write_trips`]
pub fn trips_loader(path: &Path) -> TextLoader {
    TextLoader::new(path).with_options(TextLoaderOptions {
        has_header: true,
        separator: b',',
        ..TextLoaderOptions::default()
    })
}

/// The validated taxi fare pipeline reading from `path`
pub fn taxi_pipeline(
    path: &Path,
    config: &TreeRegressorConfig,
) -> Result<Pipeline<TaxiTrip, FarePrediction, Validated>> {
    Pipeline::<TaxiTrip, FarePrediction>::builder()
        .loader(trips_loader(path))
        .add(ColumnCopier::single("FareAmount", "Label"))
        .add(OneHotVectorizer::new(["VendorId", "RateCode", "PaymentType"]))
        .add(ColumnConcatenator::new(
            "Features",
            ["VendorId", "RateCode", "PassengerCount", "TripDistance", "PaymentType"],
        ))
        .trainer(TreeRegressor::new(config.clone()))
        .validate()
}

/// Trained taxi fare model plus the batches the prediction benchmarks score
#[derive(Debug)]
pub struct TaxiFareBench {
    train_path: PathBuf,
    config: TreeRegressorConfig,
    model: TrainedModel<TaxiTrip, FarePrediction>,
    example: TaxiTrip,
    batches: Vec<Vec<TaxiTrip>>,
}

impl TaxiFareBench {
    /// Train on `train_path`, predict the example trip, evaluate on
    /// `test_path` and publish the held-out [`RMS_METRIC`]
    pub fn setup(train_path: &Path, test_path: &Path, config: TreeRegressorConfig) -> Result<Self> {
        let model = taxi_pipeline(train_path, &config)?.train()?;

        let example = TaxiTrip::example();
        let prediction = model.predict(&example)?;
        tracing::info!(model = %model.id(), fare = prediction.fare_amount, "Predicted example trip");

        let held_out = model.load(&trips_loader(test_path))?;
        let metrics = RegressionEvaluator::new().evaluate(&model, held_out)?;
        if let Some(rms) = metrics.get("rms") {
            registry::publish_metric(RMS_METRIC, rms);
        }

        let batches = BATCH_SIZES.iter().map(|&size| vec![example.clone(); size]).collect();

        Ok(Self {
            train_path: train_path.to_path_buf(),
            config,
            model,
            example,
            batches,
        })
    }

    /// Fit the whole pipeline again from the training file
    pub fn train(&self) -> Result<TrainedModel<TaxiTrip, FarePrediction>> {
        taxi_pipeline(&self.train_path, &self.config)?.train()
    }

    /// Predict the example trip
    pub fn predict(&self) -> Result<FarePrediction> {
        self.model.predict(&self.example)
    }

    /// Predict the batch of size `BATCH_SIZES[index]`
    pub fn predict_batch(&self, index: usize) -> Result<Vec<FarePrediction>> {
        let batch = self.batches.get(index).ok_or_else(|| {
            Error::schema_general(
                "TaxiFareBench",
                format!("no batch #{index}; there are {} batch sizes", self.batches.len()),
            )
        })?;
        self.model.predict_batch(batch)
    }

    /// The model trained during setup
    pub fn model(&self) -> &TrainedModel<TaxiTrip, FarePrediction> {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_trips_are_reproducible() {
        let a = synthetic_trips(20, 7);
        assert_eq!(a, synthetic_trips(20, 7));
        assert_ne!(a, synthetic_trips(20, 8));
        assert!(a.iter().all(|trip| trip.fare_amount >= 2.5));
    }

    #[test]
    fn test_written_trips_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.csv");
        let trips = synthetic_trips(5, 1);
        write_trips(&path, &trips).unwrap();

        let rows = mlpipe_core::Loader::load(&trips_loader(&path), &TaxiTrip::record_schema()).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0][0], Value::from(trips[0].vendor_id.as_str()));
        assert_eq!(rows[4][6], Value::Numeric(trips[4].fare_amount));
    }
}
