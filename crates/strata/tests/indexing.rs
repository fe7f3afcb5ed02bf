use anyhow::Result;
use strata::{image_accessor, Buffer, BufferError, ElementType, Expr, Image};

#[test]
fn access_refers_to_name_and_type() -> Result<()> {
    let buffer = Buffer::new(ElementType::float(32), &[16, 16], "input")?;
    let x = Expr::var("x");
    let y = Expr::var("y");
    let expr = buffer.at([x.clone() + 1, y * 2]);

    let access = expr.as_access().expect("access node");
    assert_eq!(access.name, "input");
    assert_eq!(access.ty, ElementType::float(32));
    assert_eq!(access.arity(), 2);
    assert_eq!(expr.to_string(), "input((x + 1), (y * 2))");
    assert_eq!(expr.ty(), ElementType::float(32));
    Ok(())
}

#[test]
fn arity_is_not_checked_at_construction() -> Result<()> {
    let buffer = Buffer::new(ElementType::int(32), &[4, 4], "grid")?;

    let fewer = buffer.at(["x"]);
    assert_eq!(fewer.as_access().map(|a| a.arity()), Some(1));

    let more = buffer.at([Expr::var("x"), Expr::var("y"), Expr::int(0)]);
    assert_eq!(more.as_access().map(|a| a.arity()), Some(3));

    let none = buffer.at(Vec::<Expr>::new());
    assert_eq!(none.to_string(), "grid()");
    Ok(())
}

#[test]
fn access_survives_the_handle() -> Result<()> {
    let buffer = Buffer::new(ElementType::uint(8), &[10], "transient")?;
    let expr = buffer.at([Expr::var("i")]);
    drop(buffer);
    assert_eq!(expr.to_string(), "transient(i)");
    Ok(())
}

#[test]
fn nested_accesses_compose() -> Result<()> {
    let lut = Buffer::new(ElementType::int(32), &[256], "lut")?;
    let src = Buffer::new(ElementType::int(32), &[64, 64], "src")?;
    let expr = lut.at([src.at(["x", "y"])]);
    assert_eq!(expr.to_string(), "lut(src(x, y))");
    let json = expr.to_json_string()?;
    assert_eq!(Expr::from_json_str(&json)?, expr);
    Ok(())
}

#[test]
fn image_accessor_wraps_in_a_fresh_buffer() -> Result<()> {
    let image = Image::<u16, 2>::new([8, 8])?;
    let first = image_accessor(&image, ["x", "y"])?;
    let second = image_accessor(&image, ["x", "y"])?;

    let (first, second) = (
        first.as_access().expect("access node"),
        second.as_access().expect("access node"),
    );
    assert_eq!(first.ty, ElementType::uint(16));
    assert_ne!(first.name, second.name);
    Ok(())
}

#[test]
fn image_accessor_rejects_unallocated_views() -> Result<()> {
    let image = Image::<u16, 2>::unallocated([8, 8])?;
    assert!(matches!(
        image_accessor(&image, ["x", "y"]),
        Err(BufferError::InvalidArgument { .. })
    ));
    Ok(())
}
