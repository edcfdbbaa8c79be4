//! Benchmarks for outfit prompt assembly
//!
//! Run with: cargo bench --package server
//!
//! This will benchmark catalog snapshotting and prompt rendering on a
//! synthetic closet of realistic size.

use closet_model::{ClothingItem, ImagePayload, Inspiration, ItemClassification, UserPreferences};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use server::{build_outfit_prompt, snapshot_catalog, PromptContext};

const CATEGORIES: [(&str, &str); 4] = [
    ("top", "t-shirt"),
    ("bottom", "jeans"),
    ("shoes", "sneakers"),
    ("outerwear", "denim jacket"),
];

fn synthetic_closet(size: usize) -> Vec<ClothingItem> {
    // Each item carries a 64 KiB image, like a real downscaled photo.
    let image = ImagePayload::from_bytes("image/png", &vec![0x5A; 64 * 1024]);
    (0..size)
        .map(|i| {
            let (category, sub_category) = CATEGORIES[i % CATEGORIES.len()];
            ClothingItem::with_id(
                format!("item-{i}"),
                image.clone(),
                ItemClassification {
                    category: category.to_string(),
                    sub_category: sub_category.to_string(),
                    tags: vec!["casual".to_string(), "spring".to_string()],
                    dominant_colors: vec!["#1f2a44".to_string(), "#f5f5f5".to_string()],
                    has_pattern: i % 3 == 0,
                    pattern_description: None,
                },
            )
        })
        .collect()
}

fn bench_snapshot_catalog(c: &mut Criterion) {
    let closet = synthetic_closet(500);

    c.bench_function("snapshot_catalog_500", |b| {
        b.iter(|| {
            let snapshot = snapshot_catalog(black_box(&closet));
            black_box(snapshot)
        })
    });
}

fn bench_build_outfit_prompt(c: &mut Criterion) {
    let closet = synthetic_closet(200);
    let snapshot = snapshot_catalog(&closet);
    let liked: Vec<Inspiration> = (0..10)
        .map(|i| Inspiration::new(format!("Look {i}"), closet[i..i + 2].to_vec()))
        .collect();
    let preferences = UserPreferences {
        style_preferences: vec!["minimal".to_string(), "streetwear".to_string()],
        ..UserPreferences::default()
    };

    c.bench_function("build_outfit_prompt_200", |b| {
        b.iter(|| {
            let prompt = build_outfit_prompt(black_box(&PromptContext {
                weather: "light rain, 12°C (feels like 10°C), humidity 80%",
                occasion: Some("brunch"),
                preferences: Some(&preferences),
                items: &snapshot,
                liked_outfits: &liked,
            }));
            black_box(prompt)
        })
    });
}

criterion_group!(benches, bench_snapshot_catalog, bench_build_outfit_prompt);
criterion_main!(benches);
