use arith::{AdaptiveModel, ArithmeticCodec};

fn main() {
    let input = (0..10000).map(|i| (i * i % 251) as u32).collect::<Vec<_>>();

    for _ in 0..1000 {
        let mut model = AdaptiveModel::new(256).unwrap();
        let mut codec = ArithmeticCodec::new();
        codec.set_buffer(4 * input.len(), None).unwrap();

        codec.start_encoder().unwrap();
        for &symbol in &input {
            codec.encode_adaptive(symbol, &mut model).unwrap();
        }
        let code_bytes = codec.stop_encoder().unwrap();

        let stream = codec.buffer()[..code_bytes].to_vec();
        codec.set_buffer(code_bytes, Some(stream)).unwrap();
        codec.start_decoder().unwrap();
        model.reset();
        for &symbol in &input {
            assert_eq!(codec.decode_adaptive(&mut model).unwrap(), symbol);
        }
        codec.stop_decoder().unwrap();
    }
}
