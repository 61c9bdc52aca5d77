diesel::table! {
    accounts (id) {
        id -> Uuid,
        name -> Text,
        register_number -> Text,
        email -> Text,
        password_hash -> Text,
        mobile -> Text,
        department -> Text,
        city -> Text,
        role -> Integer,
        is_active -> Bool,
        created_at -> Timestamptz,
        last_login -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    routes (id) {
        id -> Uuid,
        route_name -> Text,
        route_number -> Text,
        starting_point -> Text,
        ending_point -> Text,
        stops -> Jsonb,
        start_time -> Text,
        end_time -> Text,
        distance -> Double,
        estimated_duration -> Nullable<Text>,
        fare -> Double,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    buses (id) {
        id -> Uuid,
        bus_number -> Text,
        registration_number -> Text,
        capacity -> Integer,
        current_occupancy -> Integer,
        bus_type -> Text,
        insurance_expiry -> Date,
        fitness_expiry -> Date,
        last_service_date -> Nullable<Date>,
        next_service_date -> Nullable<Date>,
        route_id -> Nullable<Uuid>,
        driver_id -> Nullable<Uuid>,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    drivers (id) {
        id -> Uuid,
        name -> Text,
        license_number -> Text,
        phone -> Text,
        address -> Text,
        experience -> Integer,
        assigned_bus -> Nullable<Uuid>,
        is_active -> Bool,
        joining_date -> Date,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    maintenance_records (id) {
        id -> Uuid,
        bus_id -> Uuid,
        maintenance_type -> Text,
        description -> Text,
        cost -> Double,
        service_date -> Date,
        next_service_date -> Nullable<Date>,
        serviced_by -> Nullable<Text>,
        status -> Text,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    applications (id) {
        id -> Uuid,
        account_id -> Uuid,
        name -> Text,
        register_number -> Text,
        department -> Text,
        academic_year -> Text,
        mobile -> Text,
        email -> Text,
        address -> Text,
        application_type -> Text,
        route_id -> Nullable<Uuid>,
        current_route_id -> Nullable<Uuid>,
        new_route_id -> Nullable<Uuid>,
        reason -> Nullable<Text>,
        status -> Text,
        decided_by -> Nullable<Uuid>,
        decided_at -> Nullable<Timestamptz>,
        rejection_reason -> Nullable<Text>,
        qr_code -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        account_id -> Uuid,
        title -> Text,
        message -> Text,
        category -> Text,
        is_read -> Bool,
        created_at -> Timestamptz,
    }
}
