use brandmorpher::captions::{
    fallback_captions, merge_captions, read_caption_file, write_caption_file,
};
use brandmorpher::compose::{ComposeJob, Compositor, TextRenderer};
use brandmorpher::config::setup_logging;
use brandmorpher::packaging::zip_directory;
use image::{Rgba, RgbaImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::Read;
use std::path::{Path, PathBuf};

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let logo = RgbaImage::from_fn(48, 24, |x, y| Rgba([(x * 5) as u8, (y * 10) as u8, 90, 255]));
    // opaque photo on white, the way product shots usually arrive
    let mut product = RgbaImage::from_pixel(80, 60, Rgba([255, 255, 255, 255]));
    for y in 15..50 {
        for x in 20..60 {
            product.put_pixel(x, y, Rgba([120, 60, 20, 255]));
        }
    }
    let logo_path = dir.join("logo.png");
    let product_path = dir.join("product.jpg");
    logo.save(&logo_path).expect("save logo");
    image::DynamicImage::ImageRgba8(product)
        .to_rgb8()
        .save(&product_path)
        .expect("save product");
    (logo_path, product_path)
}

#[test]
fn acme_boots_three_creatives() {
    let _ = setup_logging(true);
    let dir = tempfile::tempdir().expect("tempdir");
    let (logo_path, product_path) = write_inputs(dir.path());
    let out = dir.path().join("out");

    let compositor = Compositor::new(TextRenderer::load(None));
    let creatives = compositor
        .compose_with_rng(
            &ComposeJob {
                logo_path: &logo_path,
                product_path: &product_path,
                count: 3,
                canvas_size: 200,
                brand_name: "Acme",
                product_name: "Boots",
                output_dir: &out,
            },
            &mut StdRng::seed_from_u64(7),
        )
        .expect("compose");
    assert_eq!(creatives.len(), 3);

    for stem in ["creative_01", "creative_02", "creative_03"] {
        let png = image::open(out.join(format!("{stem}.png"))).expect("png");
        let jpg = image::open(out.join(format!("{stem}.jpg"))).expect("jpg");
        assert_eq!((png.width(), png.height()), (200, 200));
        assert_eq!((jpg.width(), jpg.height()), (200, 200));
    }

    let captions = std::fs::read_to_string(out.join("captions.txt")).expect("captions");
    let lines: Vec<&str> = captions.lines().collect();
    assert_eq!(lines.len(), 3);
    for (index, line) in lines.iter().enumerate() {
        let (filename, text) = line.split_once('\t').expect("tab separated");
        assert_eq!(filename, format!("creative_{:02}.jpg", index + 1));
        assert!(!text.is_empty());
        assert!(!text.contains('\t'));
    }
}

#[test]
fn api_captions_replace_by_position_then_package() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (logo_path, product_path) = write_inputs(dir.path());
    let run = dir.path().join("run");

    Compositor::new(TextRenderer::without_font())
        .compose(&ComposeJob {
            logo_path: &logo_path,
            product_path: &product_path,
            count: 3,
            canvas_size: 96,
            brand_name: "Acme",
            product_name: "Boots",
            output_dir: &run,
        })
        .expect("compose");
    let original = read_caption_file(&run).expect("read captions");

    // fewer captions than creatives leaves the tail alone
    let mut entries = original.clone();
    merge_captions(&mut entries, &["Walk taller".to_string()]);
    write_caption_file(&run, &entries).expect("write captions");
    let merged = read_caption_file(&run).expect("reread captions");
    assert_eq!(merged[0].text, "Walk taller");
    assert_eq!(merged[0].filename, "creative_01.jpg");
    assert_eq!(merged[1..], original[1..]);

    let dest = dir.path().join("run.zip");
    assert_eq!(zip_directory(&run, &dest).expect("zip"), 7);
    let mut archive =
        zip::ZipArchive::new(std::fs::File::open(&dest).expect("open")).expect("archive");
    let mut text = String::new();
    archive
        .by_name("captions.txt")
        .expect("captions entry")
        .read_to_string(&mut text)
        .expect("read entry");
    assert!(text.starts_with("creative_01.jpg\tWalk taller\n"));
}

#[test]
fn headline_text_is_drawn_without_a_system_font() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (logo_path, product_path) = write_inputs(dir.path());
    let compositor = Compositor::new(TextRenderer::load(Some(Path::new(
        "/no/such/font/anywhere.ttf",
    ))));

    let render = |brand: &str, product: &str, name: &str| {
        let out = dir.path().join(name);
        compositor
            .compose_with_rng(
                &ComposeJob {
                    logo_path: &logo_path,
                    product_path: &product_path,
                    count: 1,
                    canvas_size: 300,
                    brand_name: brand,
                    product_name: product,
                    output_dir: &out,
                },
                &mut StdRng::seed_from_u64(11),
            )
            .expect("compose");
        image::open(out.join("creative_01.png")).expect("png").to_rgba8()
    };

    let acme = render("Acme", "Boots", "acme");
    let other = render("Zyxwvutsrq", "Qwertyuiopasdf", "other");
    assert_ne!(acme, other, "different names must render different text");
}

#[test]
fn fallback_captions_are_stable() {
    assert_eq!(
        fallback_captions("Acme", "Boots", 12),
        fallback_captions("Acme", "Boots", 12)
    );
    assert_eq!(fallback_captions("Acme", "Boots", 6)[5], fallback_captions("Acme", "Boots", 1)[0]);
}
