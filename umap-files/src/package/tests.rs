use glam::DVec3;

use crate::common::types::{Guid, Rotator};
use crate::package::reader::PackageReader;
use crate::package::types::{ObjectRef, Package, PropertyBag, SoftObjectPath};

const WALL: &str = r#"{"Exports": [
    {"Type": "BuildingWall", "Name": "Wall_1", "Class": "/Game/Building/BP_Wall.BP_Wall_C", "Properties": [
        {"Name": "MyGuid", "Value": {"Guid": "0000000a0000000b0000000c0000000d"}},
        {"Name": "StaticMeshComponent", "Value": {"Object": 1}},
        {"Name": "TextureData", "ArrayIndex": 2, "Value": {"Object": "/Game/Textures/TD_Brick.TD_Brick"}},
        {"Name": "TextureData", "Value": {"Object": "/Game/Textures/TD_Wood.TD_Wood"}},
        {"Name": "AdditionalWorlds", "Value": {"Array": [{"SoftObject": "/Game/Worlds/Basement.Basement"}]}}
    ]},
    {"Type": "StaticMeshComponent", "Name": "StaticMeshComponent0", "Properties": [
        {"Name": "RelativeLocation", "Value": {"Vector": [1.0, 2.0, 3.0]}},
        {"Name": "RelativeRotation", "Value": {"Rotator": {"Pitch": 0.0, "Yaw": 90.0, "Roll": 0.0}}},
        {"Name": "OverrideMaterials", "Value": {"Array": [{"Object": null}, {"Object": "/Game/Materials/M_Brick.M_Brick"}]}}
    ]}
]}"#;

fn wall() -> Result<Package, anyhow::Error> {
    Ok(PackageReader::parse_package(
        &mut WALL.as_bytes(),
        "FortniteGame/Content/Maps/Wall",
    )?)
}

#[test]
fn simple_parse() -> Result<(), anyhow::Error> {
    let package = wall()?;

    assert_eq!(package.exports.len(), 2);
    assert_eq!(package.short_name(), "Wall");
    assert_eq!(package.exports[1].package_name, "FortniteGame/Content/Maps/Wall");
    assert_eq!(
        package.exports[0].path_name(),
        "FortniteGame/Content/Maps/Wall.Wall_1"
    );
    assert_eq!(
        package.exports[0].class,
        Some(ObjectRef::Path("/Game/Building/BP_Wall.BP_Wall_C".to_string()))
    );
    Ok(())
}

#[test]
fn typed_getters() -> Result<(), anyhow::Error> {
    let package = wall()?;
    let actor = &package.exports[0].properties;
    let component = &package.exports[1].properties;

    let guid: Guid = actor.get("myguid").ok_or(anyhow::anyhow!("guid"))?;
    assert_eq!(guid.to_string(), "0000000a0000000b0000000c0000000d");
    assert_eq!(actor.get::<ObjectRef>("StaticMeshComponent"), Some(ObjectRef::Export(1)));

    // wrong kind and missing both fall back
    assert_eq!(actor.get::<DVec3>("StaticMeshComponent"), None);
    assert_eq!(component.get_or("RelativeScale3D", DVec3::ONE), DVec3::ONE);
    assert_eq!(component.get_or("RelativeRotation", Rotator::ZERO).yaw, 90.0);

    let worlds: Vec<SoftObjectPath> = actor.get("AdditionalWorlds").ok_or(anyhow::anyhow!("worlds"))?;
    assert_eq!(worlds[0].asset_path_name, "/Game/Worlds/Basement.Basement");

    let overrides: Vec<Option<ObjectRef>> = component
        .get("OverrideMaterials")
        .ok_or(anyhow::anyhow!("overrides"))?;
    assert_eq!(overrides.len(), 2);
    assert!(overrides[0].is_none());
    assert!(overrides[1].is_some());
    Ok(())
}

#[test]
fn indexed_properties_are_densified() -> Result<(), anyhow::Error> {
    let package = wall()?;
    let texture_data: Vec<Option<ObjectRef>> = package.exports[0].properties.get_indexed("TextureData");

    assert_eq!(texture_data.len(), 3);
    assert_eq!(
        texture_data[0],
        Some(ObjectRef::Path("/Game/Textures/TD_Wood.TD_Wood".to_string()))
    );
    assert_eq!(texture_data[1], None);
    assert_eq!(
        texture_data[2],
        Some(ObjectRef::Path("/Game/Textures/TD_Brick.TD_Brick".to_string()))
    );

    assert!(
        PropertyBag::default()
            .get_indexed::<ObjectRef>("TextureData")
            .is_empty()
    );
    Ok(())
}

#[test]
fn classification() -> Result<(), anyhow::Error> {
    let json = r#"{"Exports": [
        {"Type": "World", "Name": "Apollo"},
        {"Type": "PointLightComponent", "Name": "LightComponent0"},
        {"Type": "MaterialInstanceConstant", "Name": "MI_Brick"},
        {"Type": "HierarchicalInstancedStaticMeshComponent", "Name": "Foliage"},
        {"Type": "RectLight", "Name": "Rect"}
    ]}"#;
    let package = PackageReader::parse_package(&mut json.as_bytes(), "FortniteGame/Content/Maps/Apollo")?;

    assert!(package.exports[0].is_world());
    assert!(package.exports[1].is_light_component());
    assert!(package.exports[2].is_material_interface());
    assert!(package.exports[2].is_material_instance());
    assert!(package.exports[3].is_instanced_static_mesh_component());
    assert!(package.exports[4].is_light_actor());
    assert!(package.exports[4].is_rect_light());
    assert!(!package.exports[1].is_light_actor());

    assert_eq!(package.first_of_type("World").map(|e| e.name.as_str()), Some("Apollo"));
    assert!(package.find_export("mi_brick").is_some());
    Ok(())
}

#[test]
fn rejects_malformed_documents() {
    assert!(PackageReader::parse_package(&mut "{\"Exports\": 3}".as_bytes(), "Broken").is_err());
    assert!(
        PackageReader::parse_package(
            &mut r#"{"Exports": [{"Type": "", "Name": "X"}]}"#.as_bytes(),
            "Broken"
        )
        .is_err()
    );
}

#[test]
fn dump_round_trips() -> Result<(), anyhow::Error> {
    let package = wall()?;
    let mut buf = Vec::new();
    PackageReader::dump_package(&mut buf, &package)?;

    let again = PackageReader::parse_package(&mut buf.as_slice(), &package.name)?;
    assert_eq!(again.exports.len(), package.exports.len());
    assert_eq!(again.exports[0].properties, package.exports[0].properties);
    Ok(())
}

#[test]
fn odd_values_only_affect_their_tag() -> Result<(), anyhow::Error> {
    let package = PackageReader::parse_package(
        &mut r#"{"Exports": [{"Type": "BuildingWall", "Name": "Wall", "Properties": [
            {"Name": "MyGuid", "Value": {"Guid": "abc123"}},
            {"Name": "bHidden", "Value": {"Byte": 1}},
            {"Name": "Tags", "Value": {"Array": [{"Name": "Outer"}, {"Text": {"SourceString": "x"}}]}},
            {"Name": "RelativeLocation", "Value": {"Vector": [1.0, 2.0, 3.0]}}
        ]}]}"#
            .as_bytes(),
        "FortniteGame/Content/Maps/Odd",
    )?;

    let props = &package.exports[0].properties;
    assert_eq!(props.get::<Guid>("MyGuid"), None);
    assert!(props.contains("bHidden"));
    assert_eq!(props.get::<bool>("bHidden"), None);
    assert_eq!(
        props.get::<Vec<Option<String>>>("Tags"),
        Some(vec![Some("Outer".to_string()), None])
    );
    assert_eq!(props.get::<DVec3>("RelativeLocation"), Some(DVec3::new(1.0, 2.0, 3.0)));

    // dumped verbatim
    let mut buf = Vec::new();
    PackageReader::dump_package(&mut buf, &package)?;
    let dumped = String::from_utf8(buf)?;
    assert!(dumped.contains("abc123"));
    assert!(dumped.contains("\"Byte\""));
    Ok(())
}
