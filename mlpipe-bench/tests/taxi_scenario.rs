use std::sync::OnceLock;

use proptest::prelude::*;

use mlpipe_bench::registry;
use mlpipe_bench::taxi::{synthetic_trips, taxi_pipeline, write_trips, BATCH_SIZES, RMS_METRIC};
use mlpipe_bench::{FarePrediction, TaxiFareBench, TaxiTrip};
use mlpipe_core::{
    Error, FieldKind, InputRecord, Pipeline, RecordSchema, TrainedModel, Value,
};
use mlpipe_readers::MemoryLoader;
use mlpipe_trainers::{TreeRegressor, TreeRegressorConfig};
use mlpipe_transforms::{ColumnConcatenator, ColumnCopier, OneHotVectorizer, UnknownPolicy};

fn quick_config() -> TreeRegressorConfig {
    TreeRegressorConfig {
        num_trees: 20,
        num_leaves: 8,
        min_samples_leaf: 5,
        ..TreeRegressorConfig::default()
    }
}

fn in_memory_model(trips: &[TaxiTrip], policy: UnknownPolicy) -> TrainedModel<TaxiTrip, FarePrediction> {
    Pipeline::<TaxiTrip, FarePrediction>::builder()
        .loader(MemoryLoader::from_records(trips).unwrap())
        .add(ColumnCopier::single("FareAmount", "Label"))
        .add(OneHotVectorizer::new(["VendorId", "RateCode", "PaymentType"]).with_policy(policy))
        .add(ColumnConcatenator::new(
            "Features",
            ["VendorId", "RateCode", "PassengerCount", "TripDistance", "PaymentType"],
        ))
        .trainer(TreeRegressor::new(quick_config()))
        .validate()
        .unwrap()
        .train()
        .unwrap()
}

fn shared_model() -> &'static TrainedModel<TaxiTrip, FarePrediction> {
    static MODEL: OnceLock<TrainedModel<TaxiTrip, FarePrediction>> = OnceLock::new();
    MODEL.get_or_init(|| in_memory_model(&synthetic_trips(400, 11), UnknownPolicy::ZeroFill))
}

#[test]
fn test_taxi_fare_scenario_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let train_path = dir.path().join("taxi-fare-train.csv");
    let test_path = dir.path().join("taxi-fare-test.csv");
    write_trips(&train_path, &synthetic_trips(500, 1)).unwrap();
    write_trips(&test_path, &synthetic_trips(100, 2)).unwrap();

    let bench = TaxiFareBench::setup(&train_path, &test_path, quick_config()).unwrap();

    let prediction = bench.predict().unwrap();
    assert!(prediction.fare_amount.is_finite());

    let rms = registry::metric(RMS_METRIC).unwrap();
    assert!(rms.is_finite() && rms >= 0.0);

    for (index, size) in [1, 2, 5].into_iter().enumerate() {
        let batch = bench.predict_batch(index).unwrap();
        assert_eq!(batch.len(), size);
        assert!(batch.iter().all(|p| *p == prediction));
    }
    let err = bench.predict_batch(BATCH_SIZES.len()).unwrap_err();
    assert!(matches!(err, Error::Schema { .. }), "unexpected error: {err}");

    let retrained = bench.train().unwrap();
    assert_eq!(retrained.predict(&TaxiTrip::example()).unwrap(), prediction);
}

#[test]
fn test_model_learns_the_fare() {
    let model = shared_model();
    let held_out = synthetic_trips(50, 99);
    let predictions = model.predict_batch(&held_out).unwrap();

    let mean_error: f32 = held_out
        .iter()
        .zip(&predictions)
        .map(|(trip, prediction)| (trip.fare_amount - prediction.fare_amount).abs())
        .sum::<f32>()
        / held_out.len() as f32;
    let mean_fare: f32 = held_out.iter().map(|trip| trip.fare_amount).sum::<f32>() / held_out.len() as f32;
    assert!(mean_error < mean_fare / 2.0, "mean error {mean_error} for mean fare {mean_fare}");
}

#[test]
fn test_batch_matches_single_predictions() {
    let model = shared_model();
    let trips = synthetic_trips(7, 3);
    let batch = model.predict_batch(&trips).unwrap();
    let single: Vec<FarePrediction> = trips.iter().map(|trip| model.predict(trip).unwrap()).collect();
    assert_eq!(batch, single);
}

#[test]
fn test_fitting_twice_gives_identical_models() {
    let trips = synthetic_trips(300, 5);
    let a = in_memory_model(&trips, UnknownPolicy::ZeroFill);
    let b = in_memory_model(&trips, UnknownPolicy::ZeroFill);
    assert_ne!(a.id(), b.id());

    let probe = synthetic_trips(20, 6);
    assert_eq!(a.predict_batch(&probe).unwrap(), b.predict_batch(&probe).unwrap());
}

#[test]
fn test_typo_in_concatenator_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::<TaxiTrip, FarePrediction>::builder()
        // Never read: validation fails first
        .loader(mlpipe_readers::TextLoader::new(dir.path().join("missing.csv")))
        .add(ColumnCopier::single("FareAmount", "Label"))
        .add(OneHotVectorizer::new(["VendorId", "RateCode", "PaymentType"]))
        .add(ColumnConcatenator::new("Features", ["VendorId", "TripDistanse"]))
        .trainer(TreeRegressor::default())
        .validate()
        .unwrap_err();

    assert_eq!(err.column(), Some("TripDistanse"));
    assert_eq!(err.stage(), Some("ColumnConcatenator"));
}

#[test]
fn test_taxi_pipeline_validates_without_data() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = taxi_pipeline(&dir.path().join("never-written.csv"), &quick_config()).unwrap();
    let schema = pipeline.output_schema();
    assert!(schema.contains("Features"));
    assert!(schema.contains("Score"));

    // Training is what reads the file
    assert!(matches!(pipeline.train().unwrap_err(), Error::Io(_)));
}

#[derive(Debug)]
struct DoubleBound;

impl InputRecord for DoubleBound {
    fn record_schema() -> RecordSchema {
        RecordSchema::builder("DoubleBound")
            .index("VendorId", 0, FieldKind::Text)
            .index("FareAmount", 0, FieldKind::Numeric)
            .build()
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::from("VTS"), Value::Numeric(1.0)]
    }
}

#[test]
fn test_duplicate_column_identity_is_rejected() {
    let err = Pipeline::<DoubleBound, FarePrediction>::builder()
        .add(ColumnCopier::single("FareAmount", "Label"))
        .trainer(TreeRegressor::default().with_columns("FareAmount", "Label"))
        .validate()
        .unwrap_err();
    assert!(matches!(err, Error::Schema { .. }), "unexpected error: {err}");
}

#[test]
fn test_unseen_vendor_under_error_policy() {
    let model = in_memory_model(&synthetic_trips(200, 8), UnknownPolicy::Error);
    let mut trip = TaxiTrip::example();
    trip.vendor_id = "XYZ".to_string();

    let err = model.predict(&trip).unwrap_err();
    assert_eq!(err.column(), Some("VendorId"));

    // The model is untouched and keeps serving known vendors
    assert!(model.predict(&TaxiTrip::example()).unwrap().fare_amount.is_finite());
}

#[test]
fn test_unseen_vendor_is_zero_filled_by_default() {
    let mut trip = TaxiTrip::example();
    trip.vendor_id = "XYZ".to_string();
    assert!(shared_model().predict(&trip).unwrap().fare_amount.is_finite());
}

#[test]
fn test_concurrent_predictions() {
    let model = shared_model();
    let trips = synthetic_trips(16, 21);
    let expected = model.predict_batch(&trips).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = trips
            .chunks(4)
            .map(|chunk| scope.spawn(move || model.predict_batch(chunk).unwrap()))
            .collect();
        let actual: Vec<FarePrediction> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        assert_eq!(actual, expected);
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_batch_equals_single(
        trips in prop::collection::vec(
            (
                prop::sample::select(vec!["VTS", "CMT", "DDS"]),
                prop::sample::select(vec!["1", "2", "5"]),
                1.0f32..6.0,
                0.0f32..3600.0,
                0.0f32..50.0,
                prop::sample::select(vec!["CRD", "CSH"]),
            ),
            0..8,
        )
    ) {
        let trips: Vec<TaxiTrip> = trips
            .into_iter()
            .map(|(vendor, rate, passengers, time, distance, payment)| TaxiTrip {
                vendor_id: vendor.to_string(),
                rate_code: rate.to_string(),
                passenger_count: passengers,
                trip_time: time,
                trip_distance: distance,
                payment_type: payment.to_string(),
                fare_amount: 0.0,
            })
            .collect();

        let model = shared_model();
        let batch = model.predict_batch(&trips).unwrap();
        prop_assert_eq!(batch.len(), trips.len());
        for (trip, predicted) in trips.iter().zip(&batch) {
            prop_assert_eq!(model.predict(trip).unwrap(), *predicted);
        }
    }
}
