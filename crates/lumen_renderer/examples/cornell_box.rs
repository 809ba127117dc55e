//! Cornell box example.
//!
//! Path traces the classic sphere-walled box and saves it as PPM.
//! Pass the sample count as the first argument (default 4).

use lumen_renderer::scenes::cornell_box;
use lumen_renderer::{render, MaterialRegistry, RenderConfig};

fn main() {
    println!("Lumen Path Tracer - Cornell Box");
    println!("===============================");

    let samples: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(4);

    let start = std::time::Instant::now();
    let registry = MaterialRegistry::with_defaults();
    let scene = cornell_box(&registry).expect("Failed to build scene");
    println!(
        "Scene built in {:?} ({} objects, {} BVH nodes)",
        start.elapsed(),
        scene.objects().len(),
        scene.bvh().node_count()
    );

    let config = RenderConfig::default().with_samples(samples, 2);
    println!(
        "Rendering {}x{} @ {} estimates per pixel...",
        config.width,
        config.height,
        config.estimates_per_pixel()
    );

    let start = std::time::Instant::now();
    let image = render(&scene, &config).expect("Failed to render");
    println!("Rendered in {:?}", start.elapsed());

    let filename = "cornell_box.ppm";
    image.save_ppm(filename).expect("Failed to save image");
    println!("Saved to {}", filename);
}
