// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use turath::signup::{validate, Field, IssueKind, RegistrationForm};

#[derive(Arbitrary, Debug)]
struct Input {
    first_name: String,
    last_name: String,
    birthday: String,
    email: String,
    phone_number: String,
    password: String,
    confirm_password: String,
}

fuzz_target!(|input: Input| {
    let form = RegistrationForm {
        first_name: input.first_name,
        last_name: input.last_name,
        birthday: input.birthday,
        email: input.email,
        phone_number: input.phone_number,
        password: input.password,
        confirm_password: input.confirm_password,
    };

    let report = validate(&form);
    assert_eq!(report, validate(&form));

    if form.password != form.confirm_password {
        assert!(report.password_mismatch);
        assert_eq!(report.errors.kind(Field::ConfirmPassword), Some(IssueKind::Mismatch));
    }
    if report.is_clean() {
        assert!(!form.email.is_empty() && !form.password.is_empty());
    }
});
