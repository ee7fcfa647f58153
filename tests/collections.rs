#[macro_use]
mod cases;

test_case!(
    empty_array,
    input: "[]",
    ast: "[]",
    value: "[]",
);

test_case!(
    array_of_expressions,
    input: "[1 + 2, 3 * 4, 5 + 6]",
    ast: "[(1 + 2), (3 * 4), (5 + 6)]",
    value: "[3, 12, 11]",
);

test_case!(
    mixed_array,
    input: r#"[1, "two", true, [3]]"#,
    value: "[1, two, true, [3]]",
);

test_case!(
    array_index,
    input: "[1, 2, 3][1 + 1]",
    ast: "([1, 2, 3][(1 + 1)])",
    value: "3",
);

test_case!(
    array_index_out_of_range,
    input: "[1, 2, 3][3]",
    value: "null",
);

test_case!(
    array_negative_index,
    input: "[1][-1]",
    value: "null",
);

test_case!(
    nested_index,
    input: "[[1, 1, 1]][0][0]",
    value: "1",
);

test_case!(
    string_concatenation,
    input: r#""mon" + "key" + "banana""#,
    value: "monkeybanana",
);

test_case!(
    hash_literal,
    input: r#"{"b": 1, true: 2, 3: "c"}"#,
    value: "{3: c, true: 2, b: 1}",
);

test_case!(
    hash_computed_values,
    input: "{1: 2 + 3, 4: 5 * 6}",
    value: "{1: 5, 4: 30}",
);

test_case!(
    hash_index,
    input: r#"let h = {"one": 1, "two": 2}; h["o" + "ne"] + h["two"]"#,
    value: "3",
);

test_case!(
    hash_missing_key,
    input: "{1: 1}[0]",
    value: "null",
);

test_case!(
    hash_empty_lookup,
    input: "{}[0]",
    value: "null",
);

test_case!(
    array_as_hash_key,
    input: "{[1]: 2}",
    error: "runtime",
    message: "unusable as hash key: ARRAY",
);

test_case!(
    index_into_integer,
    input: "1[0]",
    error: "runtime",
    message: "INTEGER[INTEGER]",
);

test_case!(
    array_equality_is_unsupported,
    input: "[1] == [1]",
    error: "runtime",
);
