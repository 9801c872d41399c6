#![no_main]
use arith::{AdaptiveModel, ArithmeticCodec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<u8>, u16)| {
    let (bytes, alphabet) = data;
    let alphabet = 2 + u32::from(alphabet) % 2047; // 2..=2048

    if bytes.is_empty() {
        return;
    }

    let symbols: Vec<u32> = bytes.iter().map(|&b| u32::from(b) % alphabet).collect();

    let mut model = AdaptiveModel::new(alphabet).unwrap();
    let mut codec = ArithmeticCodec::new();
    codec.set_buffer(4 * symbols.len() + 64, None).unwrap();
    codec.start_encoder().unwrap();
    for &symbol in &symbols {
        codec.encode_adaptive(symbol, &mut model).unwrap();
    }
    let code_bytes = codec.stop_encoder().unwrap();

    let stream = codec.buffer()[..code_bytes].to_vec();
    codec.set_buffer(code_bytes, Some(stream)).unwrap();
    codec.start_decoder().unwrap();
    model.reset();
    let decoded: Vec<u32> = (0..symbols.len())
        .map(|_| codec.decode_adaptive(&mut model).unwrap())
        .collect();
    codec.stop_decoder().unwrap();

    assert_eq!(symbols, decoded);
});
