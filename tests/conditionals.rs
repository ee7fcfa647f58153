#[macro_use]
mod cases;

use indoc::indoc;

test_case!(
    if_true,
    input: "if (true) { 10 }",
    ast: "iftrue 10",
    value: "10",
);

test_case!(
    if_else,
    input: "if (1 > 2) { 10 } else { 20 }",
    ast: "if(1 > 2) 10else 20",
    value: "20",
);

test_case!(
    untaken_branch_without_else,
    input: "if (false) { 10 }",
    value: "null",
);

test_case!(
    followed_by_statement,
    input: "if (true) { 10 } else { 20 }; 3333",
    value: "3333",
);

test_case!(
    truthy_integer,
    input: "if (1) { 10 }",
    value: "10",
);

test_case!(
    null_is_falsy,
    input: "if (if (false) { 1 }) { 10 } else { 20 }",
    value: "20",
);

test_case!(
    empty_branch,
    input: "if (true) { }",
    value: "null",
);

test_case!(
    nested,
    input: indoc! {"
        let x = 5;
        if (x > 3) {
            if (x > 4) { \"big\" } else { \"medium\" }
        } else {
            \"small\"
        }
    "},
    value: "big",
);

test_case!(
    missing_paren,
    input: "if true { 1 }",
    error: "parse",
);
