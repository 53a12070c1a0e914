table! {
    users (id) {
        id -> Integer,
        username -> Varchar,
        display_name -> Varchar,
    }
}

table! {
    severity (id) {
        id -> Integer,
        name -> Varchar,
    }
}

table! {
    symptom_types (id) {
        id -> Integer,
        user_id -> Integer,
        name -> Varchar,
    }
}

table! {
    symptoms (id) {
        id -> Integer,
        type_id -> Integer,
        severity_id -> Integer,
        created -> Timestamp,
    }
}

table! {
    meals (id) {
        id -> Integer,
        user_id -> Integer,
        name -> Varchar,
        created -> Timestamp,
    }
}

table! {
    plates (id) {
        id -> Integer,
        meal_id -> Integer,
        ndbno -> Bigint,
        quantity -> Integer,
    }
}

table! {
    food (ndbno) {
        ndbno -> Bigint,
        name -> Varchar,
    }
}

table! {
    ingredients (id) {
        id -> Integer,
        food -> Bigint,
        name -> Varchar,
    }
}

joinable!(symptom_types -> users (user_id));
joinable!(symptoms -> symptom_types (type_id));
joinable!(symptoms -> severity (severity_id));
joinable!(meals -> users (user_id));
joinable!(plates -> meals (meal_id));
joinable!(plates -> food (ndbno));
joinable!(ingredients -> food (food));

allow_tables_to_appear_in_same_query!(
    users,
    severity,
    symptom_types,
    symptoms,
    meals,
    plates,
    food,
    ingredients,
);
