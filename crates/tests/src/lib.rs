//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试（流响应的线上格式）
//! - 端到端测试：配置 -> 模型 -> 分发器 -> sinks
//! - 测试模式与 sink 隔离

#[cfg(test)]
mod contract_tests {
    use contracts::{BatchResult, FeatureVector, PredictionResult, RideId, RideRecord, STATUS_OK};
    use serde_json::json;

    #[test]
    fn test_stream_output_snapshot() {
        let result = PredictionResult {
            model_name: "ride_prediction_model".into(),
            model_version: "Test123".into(),
            ride_id: RideId::Int(256),
            prediction: 11.0,
            status_code: STATUS_OK,
            ride: RideRecord::new(130, 205, 3.66),
            features: FeatureVector {
                pu_do: "130_205".into(),
                trip_distance: 3.66,
            },
        };

        let output = BatchResult::new(vec![result], vec![]).to_stream_output();
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "statusCode": 200,
                "predictions": [{
                    "model": "ride_prediction_model",
                    "version": "Test123",
                    "prediction": {"ride_id": 256, "prediction": 11.0}
                }]
            })
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use contracts::{
        ContractError, DecodeFailurePolicy, ModelConfig, PredictionResult, PredictionSink,
        RideEvent, RideId, RideRecord, ServiceConfig, SinkConfig, SinkKind, SinkType,
        StreamBatch,
    };
    use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig, DispatcherError, SinkHandle};
    use ingestion::{EventDecoder, MockRideSource};
    use model_loader::ConstantPredictor;
    use serde_json::{json, Value};
    use tokio::net::UdpSocket;

    type Seen = Arc<Mutex<Vec<RideId>>>;

    /// Spy sink recording every ride id it receives
    struct SpySink {
        name: String,
        kind: SinkKind,
        fail: bool,
        seen: Seen,
    }

    impl SpySink {
        fn handle(name: &str, kind: SinkKind, fail: bool) -> (SinkHandle, Seen) {
            let seen = Seen::default();
            let sink = Self {
                name: name.to_string(),
                kind,
                fail,
                seen: Arc::clone(&seen),
            };
            (SinkHandle::spawn(sink, 16), seen)
        }
    }

    impl PredictionSink for SpySink {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> SinkKind {
            self.kind
        }

        async fn write(&mut self, result: &PredictionResult) -> Result<(), ContractError> {
            self.seen.lock().unwrap().push(result.ride_id.clone());
            if self.fail {
                return Err(ContractError::sink_write(&self.name, "store unavailable"));
            }
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn config(test_mode: bool) -> DispatcherConfig {
        DispatcherConfig::new("ride_prediction_model", "Test123").test_mode(test_mode)
    }

    fn dispatcher(test_mode: bool, handles: Vec<SinkHandle>) -> Dispatcher {
        Dispatcher::with_handles(config(test_mode), Arc::new(ConstantPredictor::new(11.0)), handles)
    }

    fn encode(value: Value) -> String {
        STANDARD.encode(serde_json::to_vec(&value).unwrap())
    }

    fn batch_of(payloads: Vec<String>) -> StreamBatch {
        serde_json::from_value(json!({
            "Records": payloads
                .into_iter()
                .map(|data| json!({"kinesis": {"data": data}}))
                .collect::<Vec<_>>()
        }))
        .unwrap()
    }

    fn ride_payload(ride_id: i64) -> String {
        encode(json!({
            "ride": {"PULocationID": 130, "DOLocationID": 205, "trip_distance": 3.66},
            "ride_id": ride_id,
        }))
    }

    /// Base64 payload -> stream response, checked against the exact wire shape
    #[tokio::test]
    async fn test_e2e_stream_batch_response() {
        let (spy, seen) = SpySink::handle("spy", SinkKind::Local, false);
        let dispatcher = dispatcher(false, vec![spy]);

        let result = dispatcher
            .process_stream_batch(&batch_of(vec![ride_payload(256)]))
            .await
            .unwrap();

        assert_eq!(result.status_code, 200);
        assert_eq!(result.predictions[0].features.pu_do, "130_205");
        assert_eq!(
            serde_json::to_value(result.to_stream_output()).unwrap(),
            json!({
                "statusCode": 200,
                "predictions": [{
                    "model": "ride_prediction_model",
                    "version": "Test123",
                    "prediction": {"ride_id": 256, "prediction": 11.0}
                }]
            })
        );
        assert_eq!(*seen.lock().unwrap(), vec![RideId::Int(256)]);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_test_mode_skips_network_sinks() {
        let (local, local_seen) = SpySink::handle("store", SinkKind::Local, false);
        let (network, network_seen) = SpySink::handle("stream", SinkKind::Network, false);
        let dispatcher = dispatcher(true, vec![local, network]);

        let events = MockRideSource::default().events(3);
        for event in events {
            dispatcher.process_event(event).await.unwrap();
        }

        assert_eq!(local_seen.lock().unwrap().len(), 3);
        assert!(network_seen.lock().unwrap().is_empty());

        let metrics: HashMap<_, _> = dispatcher.metrics().into_iter().collect();
        assert_eq!(metrics["stream"].skipped_count, 3);
        assert_eq!(metrics["store"].write_count, 3);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_failing_sink_does_not_block_others() {
        let (broken, broken_seen) = SpySink::handle("broken", SinkKind::Local, true);
        let (healthy, healthy_seen) = SpySink::handle("healthy", SinkKind::Local, false);
        let dispatcher = dispatcher(false, vec![broken, healthy]);

        let batch = MockRideSource::default().stream_batch(4).unwrap();
        let result = dispatcher.process_stream_batch(&batch).await.unwrap();

        assert_eq!(result.predictions.len(), 4);
        assert_eq!(broken_seen.lock().unwrap().len(), 4);
        assert_eq!(healthy_seen.lock().unwrap().len(), 4);

        let metrics: HashMap<_, _> = dispatcher.metrics().into_iter().collect();
        assert_eq!(metrics["broken"].failure_count, 4);
        assert_eq!(metrics["healthy"].failure_count, 0);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_batch_order_preserved() {
        let (spy, seen) = SpySink::handle("spy", SinkKind::Local, false);
        let dispatcher = dispatcher(false, vec![spy]);

        let ids = [5, 3, 9, 1, 7];
        let payloads = ids.iter().map(|id| ride_payload(*id)).collect();
        let result = dispatcher
            .process_stream_batch(&batch_of(payloads))
            .await
            .unwrap();

        let returned: Vec<_> = result.predictions.iter().map(|p| p.ride_id.clone()).collect();
        let expected: Vec<_> = ids.iter().map(|id| RideId::Int(*id)).collect();
        assert_eq!(returned, expected);
        assert_eq!(*seen.lock().unwrap(), expected);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_decode_policies() {
        let payloads = vec![ride_payload(1), "%%%".to_string(), ride_payload(3)];

        let abort = dispatcher(false, vec![]);
        match abort.process_stream_batch(&batch_of(payloads.clone())).await {
            Err(DispatcherError::Decode { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected decode error, got {other:?}"),
        }

        let skip = Dispatcher::with_handles(
            config(false).decode_failure(DecodeFailurePolicy::Skip),
            Arc::new(ConstantPredictor::new(11.0)),
            vec![],
        );
        let result = skip
            .process_stream_batch(&batch_of(payloads))
            .await
            .unwrap();
        assert_eq!(result.predictions.len(), 2);
        assert_eq!(result.skipped_records, vec![1]);
    }

    #[tokio::test]
    async fn test_e2e_string_ride_id_round_trip() {
        let dispatcher = dispatcher(false, vec![]);
        let event = RideEvent::new("abc-123", RideRecord::new(10, 50, 40.0));

        let batch = EventDecoder::encode_batch(&[event]).unwrap();
        let result = dispatcher.process_stream_batch(&batch).await.unwrap();

        let output = serde_json::to_value(result.to_stream_output()).unwrap();
        assert_eq!(output["predictions"][0]["prediction"]["ride_id"], "abc-123");
    }

    /// Config file -> model loader -> sink factory -> persistence on disk
    #[tokio::test]
    async fn test_e2e_configured_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
[model]
version = "Test123"
constant_prediction = 11.0

[[sinks]]
name = "store"
sink_type = "persistence"
params = {{ base_path = "{}" }}
"#,
            dir.path().display()
        );
        let config: ServiceConfig = config_loader::ConfigLoader::load_from_str(
            &toml,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let model = model_loader::load_predictor(&config.model).unwrap();
        let dispatcher = DispatcherBuilder::new(
            DispatcherConfig::new(&model.name, &model.version).with_settings(&config.dispatcher),
            model.predictor,
        )
        .with_sink_configs(config.sinks.clone())
        .build()
        .await
        .unwrap();

        dispatcher
            .process_stream_batch(&batch_of(vec![ride_payload(256)]))
            .await
            .unwrap();
        dispatcher.shutdown().await;

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);

        let content = std::fs::read_to_string(&files[0]).unwrap();
        let doc: Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(doc["ride_id"], 256);
        assert_eq!(doc["PU_DO"], "130_205");
        assert_eq!(doc["prediction"], 11.0);
        assert_eq!(doc["model_version"], "Test123");
    }

    /// Republish sink over UDP, then the same config in test mode sends nothing
    #[tokio::test]
    async fn test_e2e_republish_respects_test_mode() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sink = SinkConfig {
            name: "stream".into(),
            sink_type: SinkType::Republish,
            queue_capacity: 8,
            params: [
                ("stream".to_string(), "ride_predictions".to_string()),
                ("addr".to_string(), receiver.local_addr().unwrap().to_string()),
            ]
            .into_iter()
            .collect(),
        };

        let live = DispatcherBuilder::new(config(false), Arc::new(ConstantPredictor::new(11.0)))
            .with_sink_configs([sink.clone()])
            .build()
            .await
            .unwrap();
        live.process_event(RideEvent::new(256, RideRecord::new(130, 205, 3.66)))
            .await
            .unwrap();

        let mut buf = vec![0u8; 65536];
        let len = receiver.recv(&mut buf).await.unwrap();
        let datagram: Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(datagram["stream"], "ride_predictions");
        assert_eq!(datagram["partition_key"], "256");

        let data = STANDARD.decode(datagram["data"].as_str().unwrap()).unwrap();
        let envelope: Value = serde_json::from_slice(&data).unwrap();
        assert_eq!(envelope["prediction"]["prediction"], 11.0);
        live.shutdown().await;

        let dry = DispatcherBuilder::new(config(true), Arc::new(ConstantPredictor::new(11.0)))
            .with_sink_configs([sink])
            .build()
            .await
            .unwrap();
        dry.process_event(RideEvent::new(257, RideRecord::new(130, 205, 3.66)))
            .await
            .unwrap();

        let nothing = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            receiver.recv(&mut buf),
        )
        .await;
        assert!(nothing.is_err());
        dry.shutdown().await;
    }

    #[test]
    fn test_model_config_default_name() {
        assert_eq!(ModelConfig::default().name, "ride_prediction_model");
    }
}
