use greencart_api::routes::params::{Pagination, contains_pattern};

#[test]
fn defaults_and_clamping() {
    assert_eq!(Pagination::default().normalize(), (1, 20, 0));

    let paging = Pagination {
        page: Some(0),
        per_page: Some(1_000),
    };
    assert_eq!(paging.normalize(), (1, 100, 0));

    let paging = Pagination {
        page: Some(3),
        per_page: Some(10),
    };
    assert_eq!(paging.normalize(), (3, 10, 20));
}

#[test]
fn huge_page_saturates_the_offset() {
    let paging = Pagination {
        page: Some(i64::MAX),
        per_page: Some(100),
    };
    let (page, per_page, offset) = paging.normalize();
    assert_eq!((page, per_page), (i64::MAX, 100));
    assert_eq!(offset, i64::MAX);
}

#[test]
fn search_terms_match_literally() {
    assert_eq!(contains_pattern("miel"), "%miel%");
    assert_eq!(contains_pattern("%"), "%\\%%");
    assert_eq!(contains_pattern("50_%"), "%50\\_\\%%");
    assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
}
