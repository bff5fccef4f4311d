use image::{ImageBuffer, Luma, Rgba, RgbaImage};
use meshi_terrain::render::database::{Database, Error, ResourceType, TextureFormat};
use meshi_terrain::terrain::HeightField;
use meshi_terrain::Terrain;
use std::fs;
use tempfile::TempDir;

fn write_db(dir: &TempDir) {
    fs::write(
        dir.path().join("db.json"),
        r#"{ "images": "images.json", "materials": "materials.json", "terrains": "terrains.json" }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("images.json"),
        r#"{ "images": [ { "name": "hmap", "path": "hmap.png" } ] }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("materials.json"),
        r#"{ "materials": [ { "name": "ground", "class": "Terrain" } ] }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("terrains.json"),
        r#"{ "terrains": [ { "name": "island", "heightmap": "hmap", "material": "ground", "blockSize": 33 } ] }"#,
    )
    .unwrap();

    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_fn(64, 64, |x, y| {
        Luma([((x + y) * 500) as u16])
    });
    img.save(dir.path().join("hmap.png")).unwrap();
}

#[test]
fn loads_resources_from_db_json() {
    let dir = TempDir::new().unwrap();
    write_db(&dir);
    let db = Database::new(dir.path().to_str().unwrap()).unwrap();

    let tex = db.find(ResourceType::Texture, "hmap").unwrap();
    let texture = db.texture(tex).unwrap();
    assert_eq!((texture.width, texture.height), (64, 64));
    assert_eq!(texture.format, TextureFormat::Bgra8);

    let field = HeightField::load(texture).unwrap();
    assert_eq!(field.sample(3, 4), 3500);

    let mat = db.find(ResourceType::Material, "ground").unwrap();
    assert!(db.material(mat).unwrap().is_of_class("Terrain"));

    let templates = db.terrain_configs();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].0, "island");
    assert_eq!(templates[0].1.block_size, 33);
}

#[test]
fn terrain_from_template() {
    let dir = TempDir::new().unwrap();
    write_db(&dir);
    let db = Database::new(dir.path().to_str().unwrap()).unwrap();

    let config = db.terrain_config("island").unwrap();
    let terrain = Terrain::from_config(&db, "island", config).unwrap();
    assert_eq!(terrain.block_size(), 33);
    assert_eq!(terrain.height_field().size(), 64);
    assert_eq!(terrain.block_tree().max_level(), 1);
    assert_eq!(terrain.mesh_quality(), 50.0);
}

#[test]
fn template_without_material_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_db(&dir);
    let db = Database::new(dir.path().to_str().unwrap()).unwrap();

    let mut config = db.terrain_config("island").unwrap().clone();
    config.material = None;
    assert!(Terrain::from_config(&db, "island", &config).is_err());
}

#[test]
fn missing_db_json_is_a_loading_error() {
    let dir = TempDir::new().unwrap();
    match Database::new(dir.path().to_str().unwrap()) {
        Err(Error::LoadingError(_)) => {}
        Err(other) => panic!("expected loading error, got {:?}", other),
        Ok(_) => panic!("expected loading error"),
    }
}

#[test]
fn load_image_relative_to_base() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("db.json"), "{}").unwrap();
    let mut img = RgbaImage::new(2, 2);
    img.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
    img.save(dir.path().join("ok.png")).unwrap();

    let mut db = Database::new(dir.path().to_str().unwrap()).unwrap();
    let handle = db.load_image("ok", "ok.png").unwrap();
    assert_eq!(&db.texture(handle).unwrap().pixels[0..4], &[30, 20, 10, 255]);

    assert!(matches!(
        db.load_image("missing", "missing.png"),
        Err(Error::LoadingError(_))
    ));
    assert!(matches!(db.texture(999), Err(Error::LookupError(_))));
}
