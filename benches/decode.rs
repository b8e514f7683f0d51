use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use df11::bf16;
use df11::decode::{decode_into, decode_parallel};
use df11::encode::{encode_with, EncoderConfig};

const SIZES_ALL: &[usize] = &[65_536, 1_048_576, 4_194_304];

/// Bell-curve weights: the exponent distribution real checkpoints show.
fn weight_tensor(n: usize) -> Vec<u16> {
    let mut state = 0x9E3779B97F4A7C15u64;
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let u = (state & 0xF) + ((state >> 4) & 0xF) + ((state >> 8) & 0xF)
                + ((state >> 12) & 0xF);
            let x = (u as f32 - 30.0) / 30.0;
            bf16::from_f32(x * 0.125)
        })
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("df11_encode");
    for &size in SIZES_ALL {
        let values = weight_tensor(size);
        group.throughput(Throughput::Bytes((size * 2) as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &values, |b, values| {
            b.iter(|| df11::encode(values));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("df11_decode");
    for &size in SIZES_ALL {
        let values = weight_tensor(size);
        let cfg = EncoderConfig::default();
        let bundle = encode_with(&values, &cfg).unwrap();
        group.throughput(Throughput::Bytes((size * 2) as u64));

        group.bench_with_input(BenchmarkId::new("sequential", size), &bundle, |b, bundle| {
            let mut out = vec![0u16; size];
            b.iter(|| decode_into(bundle, &mut out).unwrap());
        });

        for threads in [2usize, 4, 8] {
            group.bench_with_input(
                BenchmarkId::new(format!("parallel_{threads}"), size),
                &bundle,
                |b, bundle| {
                    let mut out = vec![0u16; size];
                    b.iter(|| decode_parallel(bundle, &mut out, threads).unwrap());
                },
            );
        }
    }
    group.finish();
}

#[cfg(feature = "webgpu")]
fn bench_decode_webgpu(c: &mut Criterion) {
    use df11::webgpu::WebGpuEngine;

    let engine = match WebGpuEngine::new() {
        Ok(e) => e,
        Err(_) => {
            eprintln!("decode: no WebGPU device, skipping WebGPU decode benchmarks");
            return;
        }
    };

    let mut group = c.benchmark_group("df11_decode_webgpu");
    for &size in &[262_144usize, 4_194_304, 16_777_216] {
        let values = weight_tensor(size);
        let bundle = df11::encode(&values);
        group.throughput(Throughput::Bytes((size * 2) as u64));

        group.bench_with_input(BenchmarkId::new("decode_webgpu", size), &bundle, |b, bundle| {
            b.iter(|| engine.df11_decode(bundle).unwrap());
        });

        group.bench_with_input(
            BenchmarkId::new("decode_webgpu_to_device", size),
            &bundle,
            |b, bundle| {
                b.iter(|| engine.df11_decode_to_device(bundle).unwrap());
            },
        );
    }
    group.finish();
}

#[cfg(not(feature = "webgpu"))]
fn bench_decode_webgpu(_c: &mut Criterion) {}

criterion_group!(benches, bench_encode, bench_decode, bench_decode_webgpu);
criterion_main!(benches);
