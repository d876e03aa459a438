// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

extern crate regionatlas;

use criterion::{criterion_group, criterion_main, Criterion};
use regionatlas::{Atlas, MappedFileHandle};
use std::{hint::black_box, sync::Arc};

pub fn criterion_benchmark(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("nt.00.nsq");
    let second = dir.path().join("nt.01.nsq");
    std::fs::write(&first, vec![0x11; 1 << 20]).unwrap();
    std::fs::write(&second, vec![0x22; 1 << 20]).unwrap();

    let atlas = Arc::new(Atlas::new(true));

    // Keep both files mapped so the loop measures sharing, not mmap
    let mut pin_first = MappedFileHandle::new(Arc::clone(&atlas));
    let mut pin_second = MappedFileHandle::new(Arc::clone(&atlas));
    pin_first.bind(&first).unwrap();
    pin_second.bind(&second).unwrap();

    c.bench_function("bench_rebind_shared", |b| {
        let mut handle = MappedFileHandle::new(Arc::clone(&atlas));
        b.iter(|| {
            handle.bind(black_box(&first)).unwrap();
            handle.bind(black_box(&second)).unwrap();
        });
    });

    c.bench_function("bench_exists_cached", |b| {
        b.iter(|| black_box(atlas.exists(black_box(&first))));
    });

    c.bench_function("bench_data_at", |b| {
        b.iter(|| black_box(pin_first.data_at(black_box(4096)).unwrap().len()));
    });

    let unlocked = Arc::new(Atlas::new(false));
    c.bench_function("bench_bind_unshared_no_lock", |b| {
        let mut handle = MappedFileHandle::new(Arc::clone(&unlocked));
        b.iter(|| {
            handle.bind(black_box(&first)).unwrap();
            handle.unbind();
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
