use std::fs;

use bloommap::{BloomError, BloomFilter, CreateOptions, Result};

fn seeded(seed: u64) -> CreateOptions {
    CreateOptions {
        seed: Some(seed),
        ..CreateOptions::default()
    }
}

/// Two independently created filters with a shared seed can be unioned
/// without going through copy_template.
#[test]
fn union_without_copy_template() -> Result<()> {
    let root = unique_root("union");
    fs::create_dir_all(&root)?;

    let mut bf1 = BloomFilter::create_with(200, 0.001, root.join("a.bloom"), &seeded(100))?;
    let mut bf2 = BloomFilter::create_with(200, 0.001, root.join("b.bloom"), &seeded(100))?;

    for i in 0..100i64 {
        bf1.insert(i)?;
    }
    for i in 100..200i64 {
        bf2.insert(i)?;
    }

    bf2.union(&bf1)?;

    for i in 0..200i64 {
        assert!(bf2.contains(i), "{} missing after union", i);
    }
    Ok(())
}

#[test]
fn intersection_without_copy_template() -> Result<()> {
    let root = unique_root("isect");
    fs::create_dir_all(&root)?;

    let mut bf1 = BloomFilter::create_with(200, 0.001, root.join("a.bloom"), &seeded(100))?;
    let mut bf2 = BloomFilter::create_with(200, 0.001, root.join("b.bloom"), &seeded(100))?;

    for i in 0..200i64 {
        bf1.insert(i)?;
    }
    for i in 50..150i64 {
        bf2.insert(i)?;
    }

    bf2.intersection(&bf1)?;

    for i in 0..50i64 {
        assert!(!bf2.contains(i), "{} present after intersection", i);
    }
    for i in 50..150i64 {
        assert!(bf2.contains(i), "{} missing after intersection", i);
    }
    for i in 150..200i64 {
        assert!(!bf2.contains(i), "{} present after intersection", i);
    }
    Ok(())
}

/// copy_template + union reproduces the original's membership exactly.
/// This is also the supported route from an anonymous filter to a
/// compatible file-backed one.
#[test]
fn copy_template_then_union_matches_original() -> Result<()> {
    let root = unique_root("tmpl");
    fs::create_dir_all(&root)?;

    let mut original = BloomFilter::new(200, 0.001)?;
    for i in 0..150i64 {
        original.insert(i)?;
    }

    let mut templ = original.copy_template(root.join("t.bloom"))?;
    assert_eq!(templ.capacity(), original.capacity());
    assert_eq!(templ.error_rate(), original.error_rate());
    assert_eq!(templ.num_hashes(), original.num_hashes());
    assert_eq!(templ.num_bits(), original.num_bits());
    assert_eq!(templ.hash_seeds(), original.hash_seeds());

    // Template starts empty.
    assert!((0..150i64).all(|i| !templ.contains(i)));

    templ.union(&original)?;
    for i in 0..150i64 {
        assert!(templ.contains(i), "{} missing after template union", i);
    }
    Ok(())
}

/// Differing seeds (or any other parameter) refuse set algebra and leave
/// both operands untouched.
#[test]
fn incompatible_filters_refuse_algebra() -> Result<()> {
    let root = unique_root("incompat");
    fs::create_dir_all(&root)?;

    let mut a = BloomFilter::create_with(200, 0.001, root.join("a.bloom"), &seeded(1))?;
    let b = BloomFilter::create_with(200, 0.001, root.join("b.bloom"), &seeded(2))?;
    let c = BloomFilter::create_with(500, 0.001, root.join("c.bloom"), &seeded(1))?;

    a.insert("kept")?;
    let a_before = a.to_base64()?;
    let b_before = b.to_base64()?;

    assert!(matches!(a.union(&b), Err(BloomError::Incompatible(_))));
    assert!(matches!(a.intersection(&b), Err(BloomError::Incompatible(_))));
    assert!(matches!(a.union(&c), Err(BloomError::Incompatible(_))));

    // No partial mutation on failure.
    assert_eq!(a.to_base64()?, a_before);
    assert_eq!(b.to_base64()?, b_before);
    assert!(a.contains("kept"));
    Ok(())
}

/// Union over-approximates membership of both sides; intersection keeps
/// every element present on both sides.
#[test]
fn algebra_preserves_true_members() -> Result<()> {
    let root = unique_root("semantics");
    fs::create_dir_all(&root)?;

    let mut a = BloomFilter::create_with(300, 0.01, root.join("a.bloom"), &seeded(9))?;
    let mut b = BloomFilter::create_with(300, 0.01, root.join("b.bloom"), &seeded(9))?;

    for i in 0..150i64 {
        a.insert(i)?;
    }
    for i in 100..250i64 {
        b.insert(i)?;
    }

    let mut u = a.copy(root.join("u.bloom"))?;
    u.union(&b)?;
    assert!((0..250i64).all(|i| u.contains(i)));

    let mut x = a.copy(root.join("x.bloom"))?;
    x.intersection(&b)?;
    // True members of both sides are never reported absent.
    assert!((100..150i64).all(|i| x.contains(i)));
    Ok(())
}

// ---------- helpers ----------

fn unique_root(prefix: &str) -> std::path::PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("bloommap-{}-{}-{}", prefix, pid, t))
}
